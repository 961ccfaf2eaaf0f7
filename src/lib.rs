pub mod constants;
pub mod error;

pub use error::RasterError;
pub use image::{ImageInfo, Plane, RasterImage};

/// Byte order of multi-byte sample words in an external container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

/// Channel layout of a decoded image, in interleave order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Gray = 1,
    GrayAlpha = 2,
    Rgb = 3,
    Rgba = 4,
}

impl ColorModel {
    pub fn component_count(self) -> usize {
        self as usize
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, Self::GrayAlpha | Self::Rgba)
    }
}

impl std::convert::TryFrom<u8> for ColorModel {
    type Error = RasterError;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::Gray),
            2 => Ok(Self::GrayAlpha),
            3 => Ok(Self::Rgb),
            4 => Ok(Self::Rgba),
            _ => Err(RasterError::UnsupportedComponentCount),
        }
    }
}

pub mod codec;
pub mod formats;
pub mod image;
