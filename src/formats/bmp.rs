//! Windows BMP / DIB.
//!
//! Reads BI_RGB at 8, 24, and 32 bits per pixel plus BI_RLE8, with
//! palette expansion for the 8-bit form. Rows are 4-byte aligned and
//! bottom-up unless the header height is negative. Writes 8-bit
//! gray-palette BMP for single-component images, 24-bit BI_RGB for RGB,
//! and 32-bit BI_RGB for RGBA.

use std::path::Path;

use log::debug;
use num_enum::TryFromPrimitive;

use crate::codec::planar::ChannelCount;
use crate::codec::scale::scale_plane;
use crate::error::RasterError;
use crate::image::{Plane, RasterImage};

use super::{ByteReader, check_dimensions, read_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
enum BmpCompression {
    Rgb = 0,
    Rle8 = 1,
    Rle4 = 2,
    Bitfields = 3,
}

const FILE_HEADER_SIZE: u32 = 14;
const INFO_HEADER_SIZE: u32 = 40;

pub fn read_bmp(path: &Path) -> Result<RasterImage, RasterError> {
    let data = read_file(path)?;
    let mut r = ByteReader::new(&data);

    if r.read_bytes(2)? != b"BM" {
        return Err(RasterError::MalformedHeader);
    }
    r.skip(8)?; // file size + reserved
    let data_offset = r.read_u32_le()? as usize;

    let header_size = r.read_u32_le()?;
    if header_size < INFO_HEADER_SIZE {
        return Err(RasterError::MalformedHeader);
    }
    let width_raw = r.read_i32_le()?;
    let height_raw = r.read_i32_le()?;
    let planes = r.read_u16_le()?;
    let bit_count = r.read_u16_le()?;
    let compression = BmpCompression::try_from(r.read_u32_le()?)
        .map_err(|_| RasterError::UnsupportedCompression)?;
    r.skip(12)?; // image size + resolution
    let mut colors_used = r.read_u32_le()? as usize;
    r.skip(4)?; // important colors
    r.skip(header_size as usize - INFO_HEADER_SIZE as usize)?;

    if planes != 1 || width_raw <= 0 || height_raw == 0 {
        return Err(RasterError::MalformedHeader);
    }
    let width = width_raw as u32;
    let top_down = height_raw < 0;
    let height = height_raw.unsigned_abs();
    check_dimensions(width, height)?;
    debug!(
        "BMP: {}x{} bpp={} compression={:?} top_down={}",
        width, height, bit_count, compression, top_down
    );

    match (bit_count, compression) {
        (8, BmpCompression::Rgb | BmpCompression::Rle8) => {}
        (24 | 32, BmpCompression::Rgb) => {}
        (_, BmpCompression::Rle4 | BmpCompression::Bitfields) => {
            return Err(RasterError::UnsupportedCompression);
        }
        _ => return Err(RasterError::UnsupportedColorDepth),
    }

    // Palette sits between the headers and the pixel data.
    let palette = if bit_count == 8 {
        if colors_used == 0 || colors_used > 256 {
            colors_used = 256;
        }
        let raw = r.read_bytes(colors_used * 4)?;
        let mut palette = Vec::with_capacity(colors_used);
        for quad in raw.chunks_exact(4) {
            palette.push([quad[2], quad[1], quad[0]]); // stored BGRx
        }
        Some(palette)
    } else {
        None
    };

    let w = width as usize;
    let h = height as usize;
    let bytes_per_pixel = bit_count as usize / 8;
    let row_stride = (w * bytes_per_pixel).div_ceil(4) * 4;

    // Decode to rows of indexed or BGR(A) bytes, top-down.
    let mut rows = vec![0u8; h * w * bytes_per_pixel];
    match compression {
        BmpCompression::Rle8 => {
            r.seek(data_offset);
            decode_rle8(&mut r, w, h, top_down, &mut rows)?;
        }
        _ => {
            if data.len() < data_offset + row_stride * h {
                return Err(RasterError::TruncatedRead);
            }
            for y in 0..h {
                let src_y = if top_down { y } else { h - 1 - y };
                let src = &data[data_offset + src_y * row_stride..][..w * bytes_per_pixel];
                rows[y * w * bytes_per_pixel..][..w * bytes_per_pixel].copy_from_slice(src);
            }
        }
    }

    let pixels = w * h;
    match palette {
        Some(palette) => {
            let grayscale = palette.iter().all(|[r, g, b]| r == g && g == b);
            let count = if grayscale { 1 } else { 3 };
            let mut planes: Vec<Plane> =
                (0..count).map(|_| Plane::new(8, false, pixels)).collect();
            for (i, &index) in rows.iter().enumerate() {
                let entry = palette
                    .get(index as usize)
                    .ok_or(RasterError::InvalidData)?;
                if grayscale {
                    planes[0].data[i] = entry[0] as i32;
                } else {
                    planes[0].data[i] = entry[0] as i32;
                    planes[1].data[i] = entry[1] as i32;
                    planes[2].data[i] = entry[2] as i32;
                }
            }
            Ok(RasterImage::new(width, height, planes))
        }
        None => {
            let count = bytes_per_pixel; // 3 or 4
            let cc =
                ChannelCount::new(count as u8).ok_or(RasterError::UnsupportedComponentCount)?;
            let mut interleaved = vec![0i32; pixels * count];
            for (px, src) in interleaved
                .chunks_exact_mut(count)
                .zip(rows.chunks_exact(count))
            {
                px[0] = src[2] as i32;
                px[1] = src[1] as i32;
                px[2] = src[0] as i32;
                if count == 4 {
                    px[3] = src[3] as i32;
                }
            }
            let mut planes: Vec<Plane> =
                (0..count).map(|_| Plane::new(8, false, pixels)).collect();
            {
                let mut refs: Vec<&mut [i32]> =
                    planes.iter_mut().map(|p| p.data.as_mut_slice()).collect();
                cc.deinterleave(&interleaved, &mut refs);
            }
            Ok(RasterImage::new(width, height, planes))
        }
    }
}

pub fn write_bmp(path: &Path, image: &RasterImage) -> Result<(), RasterError> {
    image.validate()?;
    let count = image.component_count();
    let cc = ChannelCount::new(count as u8).ok_or(RasterError::UnsupportedComponentCount)?;
    if count == 2 {
        return Err(RasterError::UnsupportedComponentCount);
    }

    // BMP is an 8-bit container; re-bias signed planes and rescale
    // anything that is not 8-bit.
    let adjust = image.planes[0].adjust();
    let pixels = image.pixel_count();
    let mut interleaved = vec![0i32; pixels * count];
    {
        let scaled: Vec<Plane> = image
            .planes
            .iter()
            .map(|p| {
                let mut p = p.clone();
                scale_plane(&mut p, 8);
                p
            })
            .collect();
        let refs: Vec<&[i32]> = scaled.iter().map(|p| p.data.as_slice()).collect();
        cc.interleave(&refs, if adjust != 0 { 128 } else { 0 }, &mut interleaved);
    }

    let w = image.width as usize;
    let h = image.height as usize;
    let bytes_per_pixel = if count == 1 { 1 } else { count };
    let row_stride = (w * bytes_per_pixel).div_ceil(4) * 4;
    let palette_size = if count == 1 { 256 * 4 } else { 0 };
    let data_offset = FILE_HEADER_SIZE + INFO_HEADER_SIZE + palette_size as u32;
    let file_size = data_offset + (row_stride * h) as u32;

    let mut out = Vec::with_capacity(file_size as usize);
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&file_size.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&data_offset.to_le_bytes());

    out.extend_from_slice(&INFO_HEADER_SIZE.to_le_bytes());
    out.extend_from_slice(&(image.width as i32).to_le_bytes());
    out.extend_from_slice(&(image.height as i32).to_le_bytes()); // bottom-up
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&((bytes_per_pixel * 8) as u16).to_le_bytes());
    out.extend_from_slice(&(BmpCompression::Rgb as u32).to_le_bytes());
    out.extend_from_slice(&((row_stride * h) as u32).to_le_bytes());
    out.extend_from_slice(&7873i32.to_le_bytes()); // 200 dpi
    out.extend_from_slice(&7873i32.to_le_bytes());
    out.extend_from_slice(&[0; 8]); // colors used / important

    if count == 1 {
        for v in 0..=255u8 {
            out.extend_from_slice(&[v, v, v, 0]);
        }
    }

    // Bottom-up rows, BGR(A) order, zero-padded to the 4-byte stride.
    for y in (0..h).rev() {
        let row_start = out.len();
        for x in 0..w {
            let px = &interleaved[(y * w + x) * count..][..count];
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
        out.resize(row_start + row_stride, 0);
    }
    std::fs::write(path, out)?;
    Ok(())
}

/// BI_RLE8: counted runs, escape 0 + {0: end of line, 1: end of bitmap,
/// 2: position delta, n>=3: literal run padded to 2 bytes}.
fn decode_rle8(
    r: &mut ByteReader<'_>,
    width: usize,
    height: usize,
    top_down: bool,
    dst: &mut [u8],
) -> Result<(), RasterError> {
    let mut x = 0usize;
    let mut y = 0usize;
    let row_index = |y: usize| if top_down { y } else { height - 1 - y };

    loop {
        let count = r.read_u8()?;
        let value = r.read_u8()?;
        if count > 0 {
            let run = count as usize;
            if y >= height || x + run > width {
                return Err(RasterError::InvalidData);
            }
            let row = row_index(y);
            dst[row * width + x..row * width + x + run].fill(value);
            x += run;
        } else {
            match value {
                0 => {
                    x = 0;
                    y += 1;
                }
                1 => return Ok(()),
                2 => {
                    let dx = r.read_u8()? as usize;
                    let dy = r.read_u8()? as usize;
                    x += dx;
                    y += dy;
                    if x > width || y > height {
                        return Err(RasterError::InvalidData);
                    }
                }
                n => {
                    let run = n as usize;
                    if y >= height || x + run > width {
                        return Err(RasterError::InvalidData);
                    }
                    let row = row_index(y);
                    let literal = r.read_bytes(run)?;
                    dst[row * width + x..row * width + x + run].copy_from_slice(literal);
                    x += run;
                    if run % 2 == 1 {
                        r.skip(1)?; // literal runs are word-aligned
                    }
                }
            }
        }
    }
}
