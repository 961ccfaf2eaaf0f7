//! Netpbm family: PBM/PGM/PPM in plain (P1..P3) and raw (P4..P6)
//! variants, plus PAM (P7).
//!
//! Raw samples are one byte up to maxval 255, two big-endian bytes above
//! that. P4 bitmap rows are MSB-first bit-packed and byte-aligned per
//! row. PBM stores 1 = black; samples are inverted to the usual
//! 1 = white convention on read and back on write.

use std::path::Path;

use log::debug;

use crate::codec::bitpack::BitDepth;
use crate::codec::planar::ChannelCount;
use crate::error::RasterError;
use crate::image::{Plane, RasterImage};

use super::{check_dimensions, read_file};

pub fn read_pnm(path: &Path) -> Result<RasterImage, RasterError> {
    let data = read_file(path)?;
    if data.len() < 2 || data[0] != b'P' {
        return Err(RasterError::MalformedHeader);
    }
    match data[1] {
        b'1' | b'4' => read_pbm(&data),
        b'2' | b'3' | b'5' | b'6' => read_pgm_ppm(&data),
        b'7' => read_pam(&data),
        _ => Err(RasterError::MalformedHeader),
    }
}

/// Write `image` as PGM (1 component), PPM (3), or PAM (2/4).
///
/// Signed planes are re-biased into the unsigned domain; precision above
/// 16 bits per sample cannot occur in the image model.
pub fn write_pnm(path: &Path, image: &RasterImage) -> Result<(), RasterError> {
    image.validate()?;
    let count = image.component_count();
    let cc = ChannelCount::new(count as u8).ok_or(RasterError::UnsupportedComponentCount)?;

    let prec = image.planes.iter().map(|p| p.prec).max().unwrap_or(8);
    let maxval = (1u32 << prec) - 1;
    let pixels = image.pixel_count();

    let mut header = match count {
        1 => format!("P5\n{} {}\n{}\n", image.width, image.height, maxval),
        3 => format!("P6\n{} {}\n{}\n", image.width, image.height, maxval),
        _ => {
            let tupltype = if count == 2 {
                "GRAYSCALE_ALPHA"
            } else {
                "RGB_ALPHA"
            };
            format!(
                "P7\nWIDTH {}\nHEIGHT {}\nDEPTH {}\nMAXVAL {}\nTUPLTYPE {}\nENDHDR\n",
                image.width, image.height, count, maxval, tupltype
            )
        }
    }
    .into_bytes();

    let adjust = image.planes[0].adjust();
    let mut interleaved = vec![0i32; pixels * count];
    let refs: Vec<&[i32]> = image.planes.iter().map(|p| p.data.as_slice()).collect();
    cc.interleave(&refs, adjust, &mut interleaved);

    if maxval < 256 {
        header.extend(interleaved.iter().map(|&v| v.clamp(0, maxval as i32) as u8));
    } else {
        for &v in &interleaved {
            let v = v.clamp(0, maxval as i32) as u16;
            header.extend_from_slice(&v.to_be_bytes());
        }
    }
    std::fs::write(path, header)?;
    Ok(())
}

/// Incremental token scanner for the whitespace-and-comment header
/// syntax shared by P1..P6.
struct PnmScanner<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PnmScanner<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn skip_space_and_comments(&mut self) {
        while self.pos < self.data.len() {
            let b = self.data[self.pos];
            if b == b'#' {
                while self.pos < self.data.len() && self.data[self.pos] != b'\n' {
                    self.pos += 1;
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn next_u32(&mut self) -> Result<u32, RasterError> {
        self.skip_space_and_comments();
        let start = self.pos;
        while self.pos < self.data.len() && self.data[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(RasterError::MalformedHeader);
        }
        std::str::from_utf8(&self.data[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(RasterError::MalformedHeader)
    }

    /// A single plain-PBM digit; P1 digits need not be whitespace-separated.
    fn next_bit(&mut self) -> Result<u32, RasterError> {
        self.skip_space_and_comments();
        match self.data.get(self.pos) {
            Some(b @ (b'0' | b'1')) => {
                self.pos += 1;
                Ok((*b - b'0') as u32)
            }
            _ => Err(RasterError::InvalidData),
        }
    }

    /// Step over the single whitespace byte that separates the header
    /// from raw sample data.
    fn expect_raster_start(&mut self) -> Result<usize, RasterError> {
        if self.pos >= self.data.len() {
            return Err(RasterError::TruncatedRead);
        }
        Ok(self.pos + 1)
    }
}

fn read_pbm(data: &[u8]) -> Result<RasterImage, RasterError> {
    let plain = data[1] == b'1';
    let mut scanner = PnmScanner::new(&data[2..]);
    let width = scanner.next_u32()?;
    let height = scanner.next_u32()?;
    check_dimensions(width, height)?;
    debug!("PBM: {}x{} plain={}", width, height, plain);

    let pixels = width as usize * height as usize;
    let mut plane = Plane::new(1, false, pixels);

    if plain {
        for d in plane.data.iter_mut() {
            *d = 1 - scanner.next_bit()? as i32;
        }
    } else {
        let start = 2 + scanner.expect_raster_start()?;
        let depth = BitDepth::new(1).ok_or(RasterError::UnsupportedBitDepth)?;
        let row_bytes = depth.byte_len(width as usize);
        let body = &data[start..];
        if body.len() < row_bytes * height as usize {
            return Err(RasterError::TruncatedRead);
        }
        let mut row = vec![0i32; width as usize];
        for y in 0..height as usize {
            depth.unpack(&body[y * row_bytes..], &mut row);
            for (d, s) in plane.data[y * width as usize..][..width as usize]
                .iter_mut()
                .zip(&row)
            {
                *d = 1 - *s;
            }
        }
    }
    Ok(RasterImage::new(width, height, vec![plane]))
}

fn read_pgm_ppm(data: &[u8]) -> Result<RasterImage, RasterError> {
    let format = data[1];
    let plain = format == b'2' || format == b'3';
    let count = if format == b'3' || format == b'6' { 3 } else { 1 };

    let mut scanner = PnmScanner::new(&data[2..]);
    let width = scanner.next_u32()?;
    let height = scanner.next_u32()?;
    let maxval = scanner.next_u32()?;
    check_dimensions(width, height)?;
    if maxval == 0 || maxval > 65535 {
        return Err(RasterError::UnsupportedColorDepth);
    }
    let prec = (32 - maxval.leading_zeros()) as u8;
    debug!(
        "PNM: P{} {}x{} maxval={} prec={}",
        format as char, width, height, maxval, prec
    );

    let pixels = width as usize * height as usize;
    let mut interleaved = vec![0i32; pixels * count];

    if plain {
        for d in interleaved.iter_mut() {
            *d = scanner.next_u32()? as i32;
        }
    } else {
        let start = 2 + scanner.expect_raster_start()?;
        let body = &data[start..];
        read_raw_samples(body, maxval, &mut interleaved)?;
    }

    finish_interleaved(width, height, prec, count as u8, &interleaved)
}

fn read_pam(data: &[u8]) -> Result<RasterImage, RasterError> {
    let text_end = data.len().min(1024);
    let mut width = 0u32;
    let mut height = 0u32;
    let mut depth = 0u32;
    let mut maxval = 0u32;
    let mut pos = 0usize;
    let mut body_start = None;

    // Header is line-oriented: KEYWORD [value] pairs until ENDHDR.
    while pos < text_end {
        let line_end = data[pos..text_end]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| pos + i)
            .ok_or(RasterError::MalformedHeader)?;
        let line =
            std::str::from_utf8(&data[pos..line_end]).map_err(|_| RasterError::MalformedHeader)?;
        pos = line_end + 1;

        let mut tokens = line.split_ascii_whitespace();
        match tokens.next() {
            Some("P7") | None => {}
            Some(comment) if comment.starts_with('#') => {}
            Some("ENDHDR") => {
                body_start = Some(pos);
                break;
            }
            Some(key) => {
                let value = tokens.next();
                let parse = |v: Option<&str>| -> Result<u32, RasterError> {
                    v.and_then(|s| s.parse().ok())
                        .ok_or(RasterError::MalformedHeader)
                };
                match key {
                    "WIDTH" => width = parse(value)?,
                    "HEIGHT" => height = parse(value)?,
                    "DEPTH" => depth = parse(value)?,
                    "MAXVAL" => maxval = parse(value)?,
                    "TUPLTYPE" => {}
                    _ => return Err(RasterError::MalformedHeader),
                }
            }
        }
    }
    let body_start = body_start.ok_or(RasterError::MalformedHeader)?;

    check_dimensions(width, height)?;
    if !(1..=4).contains(&depth) {
        return Err(RasterError::UnsupportedComponentCount);
    }
    if maxval == 0 || maxval > 65535 {
        return Err(RasterError::UnsupportedColorDepth);
    }
    let prec = (32 - maxval.leading_zeros()) as u8;
    debug!(
        "PAM: {}x{} depth={} maxval={} prec={}",
        width, height, depth, maxval, prec
    );

    let pixels = width as usize * height as usize;
    let mut interleaved = vec![0i32; pixels * depth as usize];
    read_raw_samples(&data[body_start..], maxval, &mut interleaved)?;

    finish_interleaved(width, height, prec, depth as u8, &interleaved)
}

fn read_raw_samples(body: &[u8], maxval: u32, dst: &mut [i32]) -> Result<(), RasterError> {
    if maxval < 256 {
        if body.len() < dst.len() {
            return Err(RasterError::TruncatedRead);
        }
        for (d, s) in dst.iter_mut().zip(body) {
            *d = *s as i32;
        }
    } else {
        if body.len() < dst.len() * 2 {
            return Err(RasterError::TruncatedRead);
        }
        for (d, s) in dst.iter_mut().zip(body.chunks_exact(2)) {
            *d = u16::from_be_bytes([s[0], s[1]]) as i32;
        }
    }
    Ok(())
}

fn finish_interleaved(
    width: u32,
    height: u32,
    prec: u8,
    count: u8,
    interleaved: &[i32],
) -> Result<RasterImage, RasterError> {
    let cc = ChannelCount::new(count).ok_or(RasterError::UnsupportedComponentCount)?;
    let pixels = width as usize * height as usize;
    let mut planes: Vec<Plane> = (0..count).map(|_| Plane::new(prec, false, pixels)).collect();
    {
        let mut refs: Vec<&mut [i32]> = planes.iter_mut().map(|p| p.data.as_mut_slice()).collect();
        cc.deinterleave(interleaved, &mut refs);
    }
    Ok(RasterImage::new(width, height, planes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp(name: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        (dir, path)
    }

    #[test]
    fn test_plain_pgm_with_comments() {
        let (_dir, path) = tmp("t.pgm");
        std::fs::write(&path, b"P2\n# comment\n3 2\n255\n0 1 2\n253 254 255\n").unwrap();
        let image = read_pnm(&path).unwrap();
        assert_eq!(image.width, 3);
        assert_eq!(image.height, 2);
        assert_eq!(image.planes[0].prec, 8);
        assert_eq!(image.planes[0].data, [0, 1, 2, 253, 254, 255]);
    }

    #[test]
    fn test_raw_ppm_roundtrip() {
        let (_dir, path) = tmp("t.ppm");
        let image = RasterImage::new(
            2,
            2,
            vec![
                Plane {
                    prec: 8,
                    signed: false,
                    data: vec![255, 0, 10, 20],
                },
                Plane {
                    prec: 8,
                    signed: false,
                    data: vec![0, 255, 11, 21],
                },
                Plane {
                    prec: 8,
                    signed: false,
                    data: vec![0, 0, 12, 22],
                },
            ],
        );
        write_pnm(&path, &image).unwrap();

        let back = read_pnm(&path).unwrap();
        assert_eq!(back.component_count(), 3);
        for c in 0..3 {
            assert_eq!(back.planes[c].data, image.planes[c].data);
        }
    }

    #[test]
    fn test_16bit_pgm_roundtrip() {
        let (_dir, path) = tmp("t.pgm");
        let image = RasterImage::new(
            2,
            1,
            vec![Plane {
                prec: 12,
                signed: false,
                data: vec![0, 4095],
            }],
        );
        write_pnm(&path, &image).unwrap();

        let back = read_pnm(&path).unwrap();
        assert_eq!(back.planes[0].prec, 12);
        assert_eq!(back.planes[0].data, [0, 4095]);
    }

    #[test]
    fn test_pam_rgba_roundtrip() {
        let (_dir, path) = tmp("t.pam");
        let planes: Vec<Plane> = (0..4)
            .map(|c| Plane {
                prec: 8,
                signed: false,
                data: vec![c * 10, c * 10 + 1],
            })
            .collect();
        let image = RasterImage::new(2, 1, planes);
        write_pnm(&path, &image).unwrap();

        let back = read_pnm(&path).unwrap();
        assert_eq!(back.component_count(), 4);
        for c in 0..4 {
            assert_eq!(back.planes[c].data, image.planes[c].data);
        }
    }

    #[test]
    fn test_raw_pbm_unpacks_rows() {
        let (_dir, path) = tmp("t.pbm");
        // 10-pixel-wide rows pack to 2 bytes each; 1 = black inverts to 0.
        std::fs::write(&path, [b"P4\n10 2\n".as_slice(), &[0xFF, 0xC0, 0x00, 0x00]].concat())
            .unwrap();
        let image = read_pnm(&path).unwrap();
        assert_eq!(image.planes[0].prec, 1);
        assert_eq!(image.planes[0].data[..10], [0; 10]);
        assert_eq!(image.planes[0].data[10..], [1; 10]);
    }

    #[test]
    fn test_truncated_raw_body() {
        let (_dir, path) = tmp("t.pgm");
        std::fs::write(&path, b"P5\n4 4\n255\n1234").unwrap();
        assert!(matches!(read_pnm(&path), Err(RasterError::TruncatedRead)));
    }
}
