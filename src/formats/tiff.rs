//! Baseline TIFF, uncompressed strips only.
//!
//! This is the container that stores samples bit-packed at any width
//! from 1 to 16: rows pack all samples of all channels MSB-first and are
//! byte-aligned, strips hold whole rows. Both byte orders are read;
//! little-endian single-strip files are written. Compressed files,
//! planar configuration 2, and tiled files are rejected.

use std::collections::HashMap;
use std::path::Path;

use log::debug;
use num_enum::TryFromPrimitive;

use crate::codec::bitpack::BitDepth;
use crate::codec::planar::ChannelCount;
use crate::error::RasterError;
use crate::image::{Plane, RasterImage};

use super::{ByteReader, check_dimensions, read_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u16)]
enum TiffFieldType {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    Rational = 5,
}

impl TiffFieldType {
    fn size(self) -> usize {
        match self {
            Self::Byte | Self::Ascii => 1,
            Self::Short => 2,
            Self::Long => 4,
            Self::Rational => 8,
        }
    }
}

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_STRIP_OFFSETS: u16 = 273;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TAG_ROWS_PER_STRIP: u16 = 278;
const TAG_STRIP_BYTE_COUNTS: u16 = 279;
const TAG_PLANAR_CONFIGURATION: u16 = 284;
const TAG_EXTRA_SAMPLES: u16 = 338;
const TAG_SAMPLE_FORMAT: u16 = 339;

const COMPRESSION_NONE: u32 = 1;
const PHOTOMETRIC_MINISWHITE: u32 = 0;
const PHOTOMETRIC_MINISBLACK: u32 = 1;
const PHOTOMETRIC_RGB: u32 = 2;
const SAMPLE_FORMAT_UINT: u32 = 1;
const SAMPLE_FORMAT_INT: u32 = 2;

pub fn read_tiff(path: &Path) -> Result<RasterImage, RasterError> {
    let data = read_file(path)?;
    let mut r = ByteReader::new(&data);

    let big_endian = match r.read_bytes(2)? {
        b"II" => false,
        b"MM" => true,
        _ => return Err(RasterError::MalformedHeader),
    };
    let read_u16 = |r: &mut ByteReader<'_>| {
        if big_endian {
            r.read_u16_be()
        } else {
            r.read_u16_le()
        }
    };
    let read_u32 = |r: &mut ByteReader<'_>| {
        if big_endian {
            r.read_u32_be()
        } else {
            r.read_u32_le()
        }
    };

    if read_u16(&mut r)? != 42 {
        return Err(RasterError::MalformedHeader);
    }
    let ifd_offset = read_u32(&mut r)? as usize;
    r.seek(ifd_offset);

    // Collect the first IFD into tag -> values; later IFDs are ignored.
    let entry_count = read_u16(&mut r)?;
    let mut fields: HashMap<u16, Vec<u32>> = HashMap::new();
    for _ in 0..entry_count {
        let tag = read_u16(&mut r)?;
        let field_type = read_u16(&mut r)?;
        let count = read_u32(&mut r)? as usize;
        let value_pos = r.position();

        let Ok(field_type) = TiffFieldType::try_from(field_type) else {
            r.seek(value_pos + 4);
            continue; // unknown field type, skip the entry
        };
        let total = field_type.size().checked_mul(count).ok_or(RasterError::MalformedHeader)?;
        if total > 4 {
            let offset = read_u32(&mut r)? as usize;
            r.seek(offset);
        }
        let mut values = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let v = match field_type {
                TiffFieldType::Byte | TiffFieldType::Ascii => r.read_u8()? as u32,
                TiffFieldType::Short => read_u16(&mut r)? as u32,
                TiffFieldType::Long => read_u32(&mut r)?,
                TiffFieldType::Rational => {
                    let num = read_u32(&mut r)?;
                    read_u32(&mut r)?; // denominator dropped
                    num
                }
            };
            values.push(v);
        }
        fields.insert(tag, values);
        r.seek(value_pos + 4);
    }

    let first = |tag: u16| -> Option<u32> { fields.get(&tag).and_then(|v| v.first().copied()) };

    let width = first(TAG_IMAGE_WIDTH).ok_or(RasterError::MalformedHeader)?;
    let height = first(TAG_IMAGE_LENGTH).ok_or(RasterError::MalformedHeader)?;
    check_dimensions(width, height)?;

    if first(TAG_COMPRESSION).unwrap_or(COMPRESSION_NONE) != COMPRESSION_NONE {
        return Err(RasterError::UnsupportedCompression);
    }
    if first(TAG_PLANAR_CONFIGURATION).unwrap_or(1) != 1 {
        return Err(RasterError::UnsupportedCompression);
    }

    let spp = first(TAG_SAMPLES_PER_PIXEL).unwrap_or(1);
    let cc = ChannelCount::new(spp as u8).ok_or(RasterError::UnsupportedComponentCount)?;

    let bits_values = fields
        .get(&TAG_BITS_PER_SAMPLE)
        .cloned()
        .unwrap_or_else(|| vec![1]);
    let bits = bits_values[0];
    if bits_values.iter().any(|&b| b != bits) {
        return Err(RasterError::UnsupportedColorDepth);
    }
    let depth = BitDepth::new(bits as u8).ok_or(RasterError::UnsupportedBitDepth)?;

    let photometric = first(TAG_PHOTOMETRIC).unwrap_or(PHOTOMETRIC_MINISBLACK);
    match photometric {
        PHOTOMETRIC_MINISWHITE | PHOTOMETRIC_MINISBLACK => {
            if spp > 2 {
                return Err(RasterError::UnsupportedColorDepth);
            }
        }
        PHOTOMETRIC_RGB => {
            if spp < 3 {
                return Err(RasterError::UnsupportedColorDepth);
            }
        }
        _ => return Err(RasterError::UnsupportedColorDepth),
    }

    let signed = match first(TAG_SAMPLE_FORMAT).unwrap_or(SAMPLE_FORMAT_UINT) {
        SAMPLE_FORMAT_UINT => false,
        SAMPLE_FORMAT_INT => true,
        _ => return Err(RasterError::UnsupportedColorDepth),
    };

    let offsets = fields
        .get(&TAG_STRIP_OFFSETS)
        .ok_or(RasterError::MalformedHeader)?;
    let byte_counts = fields
        .get(&TAG_STRIP_BYTE_COUNTS)
        .ok_or(RasterError::MalformedHeader)?;
    if offsets.len() != byte_counts.len() {
        return Err(RasterError::MalformedHeader);
    }
    let rows_per_strip = first(TAG_ROWS_PER_STRIP).unwrap_or(u32::MAX).min(height) as usize;
    if rows_per_strip == 0 {
        return Err(RasterError::MalformedHeader);
    }
    debug!(
        "TIFF: {}x{} spp={} bits={} photometric={} signed={} strips={}",
        width,
        height,
        spp,
        bits,
        photometric,
        signed,
        offsets.len()
    );

    let w = width as usize;
    let h = height as usize;
    let row_samples = w * cc.count();
    let row_bytes = depth.byte_len(row_samples);

    let mut interleaved = vec![0i32; h * row_samples];
    let mut row = vec![0i32; row_samples];
    let mut y = 0usize;
    for (&offset, &byte_count) in offsets.iter().zip(byte_counts) {
        let strip_rows = rows_per_strip.min(h - y);
        if strip_rows == 0 {
            break;
        }
        let strip = data
            .get(offset as usize..offset as usize + byte_count as usize)
            .ok_or(RasterError::TruncatedRead)?;
        if strip.len() < strip_rows * row_bytes {
            return Err(RasterError::TruncatedRead);
        }
        for sy in 0..strip_rows {
            depth.unpack(&strip[sy * row_bytes..], &mut row);
            interleaved[(y + sy) * row_samples..][..row_samples].copy_from_slice(&row);
        }
        y += strip_rows;
    }
    if y < h {
        return Err(RasterError::TruncatedRead);
    }

    // Unpacked samples are raw N-bit codes; apply the sample-format and
    // photometric interpretation.
    if signed {
        let sign_bit = 1i32 << (bits - 1);
        let wrap = 1i32 << bits;
        for v in &mut interleaved {
            if *v >= sign_bit {
                *v -= wrap;
            }
        }
    } else if photometric == PHOTOMETRIC_MINISWHITE {
        let max = (1i32 << bits) - 1;
        for v in &mut interleaved {
            *v = max - *v;
        }
    }

    let pixels = w * h;
    let mut planes: Vec<Plane> = (0..cc.count())
        .map(|_| Plane::new(bits as u8, signed, pixels))
        .collect();
    {
        let mut refs: Vec<&mut [i32]> = planes.iter_mut().map(|p| p.data.as_mut_slice()).collect();
        cc.deinterleave(&interleaved, &mut refs);
    }
    Ok(RasterImage::new(width, height, planes))
}

/// Write `image` as a little-endian, single-strip, uncompressed TIFF at
/// the planes' native precision.
pub fn write_tiff(path: &Path, image: &RasterImage) -> Result<(), RasterError> {
    image.validate()?;
    let count = image.component_count();
    let cc = ChannelCount::new(count as u8).ok_or(RasterError::UnsupportedComponentCount)?;

    let prec = image.planes[0].prec;
    if image.planes.iter().any(|p| p.prec != prec) {
        return Err(RasterError::InvalidArgumentBitsPerSample);
    }
    let signed = image.planes[0].signed;
    let depth = BitDepth::new(prec).ok_or(RasterError::UnsupportedBitDepth)?;

    let w = image.width as usize;
    let h = image.height as usize;
    let row_samples = w * count;
    let row_bytes = depth.byte_len(row_samples);
    let strip_len = row_bytes * h;

    // Interleave in the native domain; signed samples keep their
    // two's-complement low bits under the pack mask.
    let mut interleaved = vec![0i32; h * row_samples];
    let refs: Vec<&[i32]> = image.planes.iter().map(|p| p.data.as_slice()).collect();
    cc.interleave(&refs, 0, &mut interleaved);

    let photometric = if count >= 3 {
        PHOTOMETRIC_RGB
    } else {
        PHOTOMETRIC_MINISBLACK
    };
    let has_alpha = count == 2 || count == 4;

    // The IFD layout must be known before the strip offset entry can be
    // filled in, so size the table up front: nine fixed entries plus the
    // optional alpha and sample-format entries, with short arrays longer
    // than two values spilling into the overflow area.
    let entry_count = 9 + usize::from(has_alpha) + usize::from(signed);
    let ifd_size = 2 + entry_count * 12 + 4;
    let array_overflow = if count > 2 { 2 * count } else { 0 };
    let overflow_size = array_overflow * (1 + usize::from(signed));
    let overflow_start = 8 + ifd_size;
    let strip_offset = overflow_start + overflow_size;

    struct Entry {
        tag: u16,
        field_type: TiffFieldType,
        values: Vec<u32>,
    }
    let mut entries = vec![
        Entry {
            tag: TAG_IMAGE_WIDTH,
            field_type: TiffFieldType::Long,
            values: vec![image.width],
        },
        Entry {
            tag: TAG_IMAGE_LENGTH,
            field_type: TiffFieldType::Long,
            values: vec![image.height],
        },
        Entry {
            tag: TAG_BITS_PER_SAMPLE,
            field_type: TiffFieldType::Short,
            values: vec![prec as u32; count],
        },
        Entry {
            tag: TAG_COMPRESSION,
            field_type: TiffFieldType::Short,
            values: vec![COMPRESSION_NONE],
        },
        Entry {
            tag: TAG_PHOTOMETRIC,
            field_type: TiffFieldType::Short,
            values: vec![photometric],
        },
        Entry {
            tag: TAG_STRIP_OFFSETS,
            field_type: TiffFieldType::Long,
            values: vec![strip_offset as u32],
        },
        Entry {
            tag: TAG_SAMPLES_PER_PIXEL,
            field_type: TiffFieldType::Short,
            values: vec![count as u32],
        },
        Entry {
            tag: TAG_ROWS_PER_STRIP,
            field_type: TiffFieldType::Long,
            values: vec![image.height],
        },
        Entry {
            tag: TAG_STRIP_BYTE_COUNTS,
            field_type: TiffFieldType::Long,
            values: vec![strip_len as u32],
        },
    ];
    if has_alpha {
        entries.push(Entry {
            tag: TAG_EXTRA_SAMPLES,
            field_type: TiffFieldType::Short,
            values: vec![1], // associated alpha
        });
    }
    if signed {
        entries.push(Entry {
            tag: TAG_SAMPLE_FORMAT,
            field_type: TiffFieldType::Short,
            values: vec![SAMPLE_FORMAT_INT; count],
        });
    }

    debug_assert_eq!(entries.len(), entry_count);

    let mut out = Vec::with_capacity(strip_offset + strip_len);
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());

    let mut overflow = Vec::with_capacity(overflow_size);
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for e in &entries {
        out.extend_from_slice(&e.tag.to_le_bytes());
        out.extend_from_slice(&(e.field_type as u16).to_le_bytes());
        out.extend_from_slice(&(e.values.len() as u32).to_le_bytes());

        let mut value_bytes = Vec::with_capacity(8);
        for &v in &e.values {
            match e.field_type {
                TiffFieldType::Short => value_bytes.extend_from_slice(&(v as u16).to_le_bytes()),
                _ => value_bytes.extend_from_slice(&v.to_le_bytes()),
            }
        }
        if value_bytes.len() > 4 {
            out.extend_from_slice(&((overflow_start + overflow.len()) as u32).to_le_bytes());
            overflow.extend_from_slice(&value_bytes);
        } else {
            value_bytes.resize(4, 0);
            out.extend_from_slice(&value_bytes);
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes()); // no next IFD
    out.extend_from_slice(&overflow);

    // Pack one byte-aligned row at a time.
    let mut row_buf = vec![0u8; row_bytes];
    for row in interleaved.chunks_exact(row_samples) {
        depth.pack(row, &mut row_buf);
        out.extend_from_slice(&row_buf);
    }
    std::fs::write(path, out)?;
    Ok(())
}
