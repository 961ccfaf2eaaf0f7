//! Truevision TGA, uncompressed and run-length encoded.
//!
//! Supported layouts: 8-bit grayscale, 24-bit BGR, and 32-bit BGRA, in
//! both uncompressed and RLE variants. Color-mapped and 16-bit images
//! are rejected. Pixel rows are stored bottom-up unless bit 5 of the
//! image descriptor is set.

use std::path::Path;

use log::debug;
use num_enum::TryFromPrimitive;

use crate::codec::planar::ChannelCount;
use crate::error::RasterError;
use crate::image::{Plane, RasterImage};

use super::{ByteReader, check_dimensions, read_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
enum TgaImageType {
    NoImage = 0,
    ColorMapped = 1,
    TrueColor = 2,
    Grayscale = 3,
    RleColorMapped = 9,
    RleTrueColor = 10,
    RleGrayscale = 11,
}

const DESCRIPTOR_TOP_DOWN: u8 = 0x20;

pub fn read_tga(path: &Path) -> Result<RasterImage, RasterError> {
    let data = read_file(path)?;
    let mut r = ByteReader::new(&data);

    let id_length = r.read_u8()?;
    let color_map_type = r.read_u8()?;
    let image_type = TgaImageType::try_from(r.read_u8()?)
        .map_err(|_| RasterError::MalformedHeader)?;
    r.skip(5)?; // color map specification
    r.skip(4)?; // x/y origin
    let width = r.read_u16_le()? as u32;
    let height = r.read_u16_le()? as u32;
    let pixel_depth = r.read_u8()?;
    let descriptor = r.read_u8()?;
    r.skip(id_length as usize)?;

    check_dimensions(width, height)?;
    if color_map_type != 0 {
        return Err(RasterError::UnsupportedColorDepth);
    }
    let (rle, count) = match (image_type, pixel_depth) {
        (TgaImageType::TrueColor, 24) => (false, 3),
        (TgaImageType::TrueColor, 32) => (false, 4),
        (TgaImageType::Grayscale, 8) => (false, 1),
        (TgaImageType::RleTrueColor, 24) => (true, 3),
        (TgaImageType::RleTrueColor, 32) => (true, 4),
        (TgaImageType::RleGrayscale, 8) => (true, 1),
        (TgaImageType::ColorMapped | TgaImageType::RleColorMapped, _) => {
            return Err(RasterError::UnsupportedColorDepth);
        }
        _ => return Err(RasterError::UnsupportedColorDepth),
    };
    let top_down = descriptor & DESCRIPTOR_TOP_DOWN != 0;
    debug!(
        "TGA: {}x{} depth={} rle={} top_down={}",
        width, height, pixel_depth, rle, top_down
    );

    let pixels = width as usize * height as usize;
    let mut bgra = vec![0u8; pixels * count];
    if rle {
        decode_rle(&mut r, count, &mut bgra)?;
    } else {
        bgra.copy_from_slice(r.read_bytes(pixels * count)?);
    }

    // BGR(A) byte order, possibly bottom-up, to RGB(A) planes.
    let cc = ChannelCount::new(count as u8).ok_or(RasterError::UnsupportedComponentCount)?;
    let mut interleaved = vec![0i32; pixels * count];
    let w = width as usize;
    for y in 0..height as usize {
        let src_y = if top_down { y } else { height as usize - 1 - y };
        for x in 0..w {
            let src = (src_y * w + x) * count;
            let dst = (y * w + x) * count;
            match count {
                1 => interleaved[dst] = bgra[src] as i32,
                3 | 4 => {
                    interleaved[dst] = bgra[src + 2] as i32;
                    interleaved[dst + 1] = bgra[src + 1] as i32;
                    interleaved[dst + 2] = bgra[src] as i32;
                    if count == 4 {
                        interleaved[dst + 3] = bgra[src + 3] as i32;
                    }
                }
                _ => unreachable!(),
            }
        }
    }

    let mut planes: Vec<Plane> = (0..count).map(|_| Plane::new(8, false, pixels)).collect();
    {
        let mut refs: Vec<&mut [i32]> = planes.iter_mut().map(|p| p.data.as_mut_slice()).collect();
        cc.deinterleave(&interleaved, &mut refs);
    }
    Ok(RasterImage::new(width, height, planes))
}

/// Write `image` as uncompressed top-down TGA (grayscale, BGR, or BGRA).
pub fn write_tga(path: &Path, image: &RasterImage) -> Result<(), RasterError> {
    image.validate()?;
    let count = image.component_count();
    let cc = ChannelCount::new(count as u8).ok_or(RasterError::UnsupportedComponentCount)?;
    let image_type = match count {
        1 => TgaImageType::Grayscale,
        3 | 4 => TgaImageType::TrueColor,
        _ => return Err(RasterError::UnsupportedComponentCount),
    };

    // TGA is an 8-bit container; re-bias signed planes and rescale
    // anything that is not 8-bit.
    let pixels = image.pixel_count();
    let adjust = image.planes[0].adjust();
    let mut interleaved = vec![0i32; pixels * count];
    {
        let scaled: Vec<Plane> = image
            .planes
            .iter()
            .map(|p| {
                let mut p = p.clone();
                crate::codec::scale::scale_plane(&mut p, 8);
                p
            })
            .collect();
        let refs: Vec<&[i32]> = scaled.iter().map(|p| p.data.as_slice()).collect();
        cc.interleave(&refs, if adjust != 0 { 128 } else { 0 }, &mut interleaved);
    }

    let mut out = Vec::with_capacity(18 + pixels * count);
    out.push(0); // id length
    out.push(0); // no color map
    out.push(image_type as u8);
    out.extend_from_slice(&[0; 5]); // color map specification
    out.extend_from_slice(&[0; 4]); // x/y origin
    out.extend_from_slice(&(image.width as u16).to_le_bytes());
    out.extend_from_slice(&(image.height as u16).to_le_bytes());
    out.push((count * 8) as u8);
    let alpha_bits = if count == 4 { 8 } else { 0 };
    out.push(DESCRIPTOR_TOP_DOWN | alpha_bits);

    for px in interleaved.chunks_exact(count) {
        match count {
            1 => out.push(px[0].clamp(0, 255) as u8),
            _ => {
                out.push(px[2].clamp(0, 255) as u8);
                out.push(px[1].clamp(0, 255) as u8);
                out.push(px[0].clamp(0, 255) as u8);
                if count == 4 {
                    out.push(px[3].clamp(0, 255) as u8);
                }
            }
        }
    }
    std::fs::write(path, out)?;
    Ok(())
}

fn decode_rle(
    r: &mut ByteReader<'_>,
    bytes_per_pixel: usize,
    dst: &mut [u8],
) -> Result<(), RasterError> {
    let mut written = 0usize;
    while written < dst.len() {
        let packet = r.read_u8()?;
        let run = (packet as usize & 0x7F) + 1;
        let len = run * bytes_per_pixel;
        if written + len > dst.len() {
            return Err(RasterError::InvalidData);
        }
        if packet & 0x80 != 0 {
            let px = r.read_bytes(bytes_per_pixel)?;
            for chunk in dst[written..written + len].chunks_exact_mut(bytes_per_pixel) {
                chunk.copy_from_slice(px);
            }
        } else {
            dst[written..written + len].copy_from_slice(r.read_bytes(len)?);
        }
        written += len;
    }
    Ok(())
}
