//! Container format readers and writers.
//!
//! Each sub-module handles one container: header parsing/writing is local
//! to the module, while all sample-level work (bit packing, layout
//! conversion, precision adaptation) goes through `crate::codec`.
//!
//! - `pgx`: OpenJPEG-style single-component test format.
//! - `pnm`: PGM/PPM (plain and raw) and PAM.
//! - `raw`: headerless sample dumps, big- or little-endian words.
//! - `tga`: Truevision TGA, uncompressed and RLE.
//! - `bmp`: Windows BMP, BI_RGB and RLE8.
//! - `tiff`: baseline uncompressed-strip TIFF, 1..=16 bits per sample.

pub mod bmp;
pub mod pgx;
pub mod pnm;
pub mod raw;
pub mod tga;
pub mod tiff;

use std::path::Path;

use crate::error::RasterError;

/// Container formats this crate can convert between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Pgx,
    Pnm,
    /// Headerless big-endian sample dump.
    Raw,
    /// Headerless little-endian sample dump.
    RawL,
    Tga,
    Bmp,
    Tiff,
}

impl FileFormat {
    /// Detect a format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pgx" => Some(Self::Pgx),
            "pgm" | "ppm" | "pnm" | "pam" => Some(Self::Pnm),
            "raw" => Some(Self::Raw),
            "rawl" => Some(Self::RawL),
            "tga" => Some(Self::Tga),
            "bmp" | "dib" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Detect a format from leading magic bytes. Raw dumps and TGA carry
    /// no magic and are only identified by extension.
    pub fn from_magic(data: &[u8]) -> Option<Self> {
        match data {
            [b'B', b'M', ..] => Some(Self::Bmp),
            [b'I', b'I', 42, 0, ..] | [b'M', b'M', 0, 42, ..] => Some(Self::Tiff),
            [b'P', b'G', ..] => Some(Self::Pgx),
            [b'P', n, ..] if (b'1'..=b'7').contains(n) => Some(Self::Pnm),
            _ => None,
        }
    }
}

/// Cursor over an in-memory container file.
///
/// All multi-byte accessors report a short buffer as `TruncatedRead`.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn read_u8(&mut self) -> Result<u8, RasterError> {
        let b = *self.data.get(self.pos).ok_or(RasterError::TruncatedRead)?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], RasterError> {
        let end = self.pos.checked_add(len).ok_or(RasterError::TruncatedRead)?;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or(RasterError::TruncatedRead)?;
        self.pos = end;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), RasterError> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_u16_le(&mut self) -> Result<u16, RasterError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u16_be(&mut self) -> Result<u16, RasterError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, RasterError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, RasterError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32_le(&mut self) -> Result<i32, RasterError> {
        Ok(self.read_u32_le()? as i32)
    }
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>, RasterError> {
    match std::fs::read(path) {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(RasterError::FileNotFound(path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Validate header-declared geometry before allocating sample buffers.
pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<(), RasterError> {
    if width == 0 || width > crate::constants::MAXIMUM_DIMENSION {
        return Err(RasterError::InvalidArgumentWidth);
    }
    if height == 0 || height > crate::constants::MAXIMUM_DIMENSION {
        return Err(RasterError::InvalidArgumentHeight);
    }
    Ok(())
}
