//! PGX: the single-component raw format used by JPEG 2000 conformance
//! test material.
//!
//! ASCII header `PG <ML|LM> <+|-><prec> <width> <height>`, one line,
//! followed by one sample per byte (prec <= 8) or per two-byte word in
//! the declared endianness. `ML` is big-endian, `LM` little-endian;
//! `-` marks signed samples.

use std::path::Path;

use log::debug;

use crate::ByteOrder;
use crate::error::RasterError;
use crate::image::{Plane, RasterImage};

use super::{check_dimensions, read_file};

pub fn read_pgx(path: &Path) -> Result<RasterImage, RasterError> {
    let data = read_file(path)?;
    let header_end = data
        .iter()
        .position(|&b| b == b'\n')
        .ok_or(RasterError::MalformedHeader)?;
    let header =
        std::str::from_utf8(&data[..header_end]).map_err(|_| RasterError::MalformedHeader)?;

    let (order, signed, prec, width, height) = parse_header(header)?;
    check_dimensions(width, height)?;
    if prec == 0 || prec > crate::constants::MAXIMUM_BITS_PER_SAMPLE {
        return Err(RasterError::UnsupportedBitDepth);
    }
    debug!(
        "PGX: {}x{} prec={} signed={} order={:?}",
        width, height, prec, signed, order
    );

    let count = width as usize * height as usize;
    let word = if prec <= 8 { 1 } else { 2 };
    let body = &data[header_end + 1..];
    if body.len() < count * word {
        return Err(RasterError::TruncatedRead);
    }

    let mut plane = Plane::new(prec, signed, count);
    match (word, signed) {
        (1, false) => {
            for (d, s) in plane.data.iter_mut().zip(body) {
                *d = *s as i32;
            }
        }
        (1, true) => {
            for (d, s) in plane.data.iter_mut().zip(body) {
                *d = *s as i8 as i32;
            }
        }
        (_, false) => {
            for (d, s) in plane.data.iter_mut().zip(body.chunks_exact(2)) {
                *d = word16(order, s) as i32;
            }
        }
        (_, true) => {
            for (d, s) in plane.data.iter_mut().zip(body.chunks_exact(2)) {
                *d = word16(order, s) as i16 as i32;
            }
        }
    }

    Ok(RasterImage::new(width, height, vec![plane]))
}

/// Write the first plane of `image` as big-endian PGX.
pub fn write_pgx(path: &Path, image: &RasterImage) -> Result<(), RasterError> {
    image.validate()?;
    let plane = &image.planes[0];

    let sign = if plane.signed { '-' } else { '+' };
    let mut out = format!(
        "PG ML {} {} {} {}\n",
        sign, plane.prec, image.width, image.height
    )
    .into_bytes();

    if plane.prec <= 8 {
        out.extend(plane.data.iter().map(|&v| v as u8));
    } else {
        for &v in &plane.data {
            out.extend_from_slice(&(v as u16).to_be_bytes());
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

fn parse_header(header: &str) -> Result<(ByteOrder, bool, u8, u32, u32), RasterError> {
    let mut tokens = header.split_ascii_whitespace();
    if tokens.next() != Some("PG") {
        return Err(RasterError::MalformedHeader);
    }
    let order = match tokens.next() {
        Some("ML") => ByteOrder::BigEndian,
        Some("LM") => ByteOrder::LittleEndian,
        _ => return Err(RasterError::MalformedHeader),
    };

    // The sign may be its own token ("- 12") or fused with the precision
    // ("-12"); an absent sign means unsigned.
    let mut signed = false;
    let mut prec_token = tokens.next().ok_or(RasterError::MalformedHeader)?;
    match prec_token {
        "+" | "-" => {
            signed = prec_token == "-";
            prec_token = tokens.next().ok_or(RasterError::MalformedHeader)?;
        }
        _ => {
            if let Some(rest) = prec_token.strip_prefix('-') {
                signed = true;
                prec_token = rest;
            } else if let Some(rest) = prec_token.strip_prefix('+') {
                prec_token = rest;
            }
        }
    }

    let prec: u8 = prec_token
        .parse()
        .map_err(|_| RasterError::MalformedHeader)?;
    let width: u32 = tokens
        .next()
        .ok_or(RasterError::MalformedHeader)?
        .parse()
        .map_err(|_| RasterError::MalformedHeader)?;
    let height: u32 = tokens
        .next()
        .ok_or(RasterError::MalformedHeader)?
        .parse()
        .map_err(|_| RasterError::MalformedHeader)?;

    Ok((order, signed, prec, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_variants() {
        let (order, signed, prec, w, h) = parse_header("PG ML + 8 640 480").unwrap();
        assert_eq!(order, ByteOrder::BigEndian);
        assert!(!signed);
        assert_eq!((prec, w, h), (8, 640, 480));

        let (order, signed, prec, ..) = parse_header("PG LM -12 16 16").unwrap();
        assert_eq!(order, ByteOrder::LittleEndian);
        assert!(signed);
        assert_eq!(prec, 12);

        // Sign is optional.
        let (_, signed, prec, ..) = parse_header("PG ML 4 2 2").unwrap();
        assert!(!signed);
        assert_eq!(prec, 4);

        assert!(parse_header("GP ML + 8 1 1").is_err());
        assert!(parse_header("PG XX + 8 1 1").is_err());
        assert!(parse_header("PG ML + 8 1").is_err());
    }

    #[test]
    fn test_roundtrip_16bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.pgx");

        let image = RasterImage::new(
            2,
            2,
            vec![Plane {
                prec: 12,
                signed: true,
                data: vec![-2048, -1, 0, 2047],
            }],
        );
        write_pgx(&path, &image).unwrap();

        let back = read_pgx(&path).unwrap();
        assert_eq!(back.width, 2);
        assert_eq!(back.height, 2);
        assert_eq!(back.planes[0].prec, 12);
        assert!(back.planes[0].signed);
        assert_eq!(back.planes[0].data, image.planes[0].data);
    }

    #[test]
    fn test_truncated_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.pgx");
        std::fs::write(&path, b"PG ML + 8 4 4\nab").unwrap();
        assert!(matches!(read_pgx(&path), Err(RasterError::TruncatedRead)));
    }
}
