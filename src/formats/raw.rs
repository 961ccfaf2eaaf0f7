//! Headerless sample dumps.
//!
//! A raw file is nothing but interleaved samples: one byte per sample up
//! to 8 bits of precision, one two-byte word above that, in the byte
//! order picked by the container variant (`.raw` big-endian, `.rawl`
//! little-endian). Geometry and sample description must be supplied by
//! the caller.

use std::path::Path;

use log::debug;

use crate::ByteOrder;
use crate::codec::planar::ChannelCount;
use crate::error::RasterError;
use crate::image::{ImageInfo, Plane, RasterImage};

use super::{check_dimensions, read_file};

pub fn read_raw(path: &Path, info: &ImageInfo, order: ByteOrder) -> Result<RasterImage, RasterError> {
    check_dimensions(info.width, info.height)?;
    if info.bits_per_sample < crate::constants::MINIMUM_BITS_PER_SAMPLE
        || info.bits_per_sample > crate::constants::MAXIMUM_BITS_PER_SAMPLE
    {
        return Err(RasterError::InvalidArgumentBitsPerSample);
    }
    let cc = ChannelCount::new(info.component_count)
        .ok_or(RasterError::InvalidArgumentComponentCount)?;

    let data = read_file(path)?;
    let pixels = info.width as usize * info.height as usize;
    let samples = pixels * cc.count();
    let word = if info.bits_per_sample <= 8 { 1 } else { 2 };
    if data.len() < samples * word {
        return Err(RasterError::TruncatedRead);
    }
    debug!(
        "raw: {}x{}x{} prec={} signed={} order={:?}",
        info.width, info.height, info.component_count, info.bits_per_sample, info.signed, order
    );

    let mut interleaved = vec![0i32; samples];
    match (word, info.signed) {
        (1, false) => {
            for (d, s) in interleaved.iter_mut().zip(&data) {
                *d = *s as i32;
            }
        }
        (1, true) => {
            for (d, s) in interleaved.iter_mut().zip(&data) {
                *d = *s as i8 as i32;
            }
        }
        (_, false) => {
            for (d, s) in interleaved.iter_mut().zip(data.chunks_exact(2)) {
                *d = word16(order, s) as i32;
            }
        }
        (_, true) => {
            for (d, s) in interleaved.iter_mut().zip(data.chunks_exact(2)) {
                *d = word16(order, s) as i16 as i32;
            }
        }
    }

    let mut planes: Vec<Plane> = (0..cc.count())
        .map(|_| Plane::new(info.bits_per_sample, info.signed, pixels))
        .collect();
    {
        let mut refs: Vec<&mut [i32]> = planes.iter_mut().map(|p| p.data.as_mut_slice()).collect();
        cc.deinterleave(&interleaved, &mut refs);
    }
    Ok(RasterImage::new(info.width, info.height, planes))
}

pub fn write_raw(path: &Path, image: &RasterImage, order: ByteOrder) -> Result<(), RasterError> {
    image.validate()?;
    let cc = ChannelCount::new(image.component_count() as u8)
        .ok_or(RasterError::UnsupportedComponentCount)?;

    let samples = image.pixel_count() * cc.count();
    let mut interleaved = vec![0i32; samples];
    let refs: Vec<&[i32]> = image.planes.iter().map(|p| p.data.as_slice()).collect();
    // Raw dumps keep the source sample domain, signed included.
    cc.interleave(&refs, 0, &mut interleaved);

    let prec = image.planes.iter().map(|p| p.prec).max().unwrap_or(8);
    let mut out = Vec::with_capacity(samples * if prec <= 8 { 1 } else { 2 });
    if prec <= 8 {
        out.extend(interleaved.iter().map(|&v| v as u8));
    } else {
        for &v in &interleaved {
            let word = v as u16;
            match order {
                ByteOrder::BigEndian => out.extend_from_slice(&word.to_be_bytes()),
                ByteOrder::LittleEndian => out.extend_from_slice(&word.to_le_bytes()),
            }
        }
    }
    std::fs::write(path, out)?;
    Ok(())
}

fn word16(order: ByteOrder, bytes: &[u8]) -> u16 {
    match order {
        ByteOrder::BigEndian => u16::from_be_bytes([bytes[0], bytes[1]]),
        ByteOrder::LittleEndian => u16::from_le_bytes([bytes[0], bytes[1]]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_rgb_8bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.raw");

        let planes: Vec<Plane> = (0..3)
            .map(|c| Plane {
                prec: 8,
                signed: false,
                data: vec![c * 3, c * 3 + 1, c * 3 + 2, 255],
            })
            .collect();
        let image = RasterImage::new(2, 2, planes);
        write_raw(&path, &image, ByteOrder::BigEndian).unwrap();

        let info = ImageInfo {
            width: 2,
            height: 2,
            bits_per_sample: 8,
            component_count: 3,
            signed: false,
        };
        let back = read_raw(&path, &info, ByteOrder::BigEndian).unwrap();
        for c in 0..3 {
            assert_eq!(back.planes[c].data, image.planes[c].data);
        }
    }

    #[test]
    fn test_roundtrip_signed_12bit_little_endian() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.rawl");

        let image = RasterImage::new(
            2,
            1,
            vec![Plane {
                prec: 12,
                signed: true,
                data: vec![-2048, 2047],
            }],
        );
        write_raw(&path, &image, ByteOrder::LittleEndian).unwrap();

        let info = ImageInfo {
            width: 2,
            height: 1,
            bits_per_sample: 12,
            component_count: 1,
            signed: true,
        };
        let back = read_raw(&path, &info, ByteOrder::LittleEndian).unwrap();
        assert_eq!(back.planes[0].data, image.planes[0].data);
    }

    #[test]
    fn test_short_file_is_truncated_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.raw");
        std::fs::write(&path, [0u8; 5]).unwrap();

        let info = ImageInfo {
            width: 2,
            height: 2,
            bits_per_sample: 8,
            component_count: 3,
            signed: false,
        };
        assert!(matches!(
            read_raw(&path, &info, ByteOrder::BigEndian),
            Err(RasterError::TruncatedRead)
        ));
    }
}
