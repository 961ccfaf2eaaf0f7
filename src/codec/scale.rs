//! Precision adaptation for decoded component planes.
//!
//! Target containers cannot always hold the source precision. Clipping
//! truncates out-of-range values to the representable range; scaling
//! remaps the full dynamic range between two bit depths. Shrinking by an
//! exact bit-count difference is a right shift; growing uses a 64-bit
//! multiply-divide so full-range values map to full-range values even
//! across non-power-of-two range ratios.

use crate::image::Plane;

/// Clamp every sample of `plane` to the range representable in `prec`
/// bits with the plane's signedness, and declare the new precision.
pub fn clip_plane(plane: &mut Plane, prec: u8) {
    let (min, max) = if plane.signed {
        (-(1i32 << (prec - 1)), (1i32 << (prec - 1)) - 1)
    } else {
        (0, (1i32 << prec) - 1)
    };
    for v in &mut plane.data {
        *v = (*v).clamp(min, max);
    }
    plane.prec = prec;
}

/// Rescale `plane` from its declared precision to `prec`.
///
/// No-op when the precision already matches. Monotone in its input:
/// a larger sample never scales below a smaller one.
pub fn scale_plane(plane: &mut Plane, prec: u8) {
    if prec == plane.prec {
        return;
    }
    if prec < plane.prec {
        let shift = plane.prec - prec;
        for v in &mut plane.data {
            *v >>= shift;
        }
    } else if plane.signed {
        let new_max = 1i64 << (prec - 1);
        let old_max = 1i64 << (plane.prec - 1);
        for v in &mut plane.data {
            *v = ((*v as i64 * new_max) / old_max) as i32;
        }
    } else {
        let new_max = (1u64 << prec) - 1;
        let old_max = (1u64 << plane.prec) - 1;
        for v in &mut plane.data {
            *v = ((*v as u64 * new_max) / old_max) as i32;
        }
    }
    plane.prec = prec;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_unsigned() {
        let mut plane = Plane {
            prec: 12,
            signed: false,
            data: vec![-5, 0, 255, 256, 4095],
        };
        clip_plane(&mut plane, 8);
        assert_eq!(plane.data, [0, 0, 255, 255, 255]);
        assert_eq!(plane.prec, 8);
    }

    #[test]
    fn test_clip_signed() {
        let mut plane = Plane {
            prec: 16,
            signed: true,
            data: vec![-4000, -128, 127, 4000],
        };
        clip_plane(&mut plane, 8);
        assert_eq!(plane.data, [-128, -128, 127, 127]);
    }

    #[test]
    fn test_clip_matches_adjust_bias() {
        // Interleaving signed data with adjust = 1 << (prec - 1) and then
        // clipping to [0, 2^prec - 1] reproduces the unsigned encoding.
        use crate::codec::planar::ChannelCount;

        let prec = 8u8;
        let signed = Plane {
            prec,
            signed: true,
            data: vec![-128, -1, 0, 127],
        };

        let cc = ChannelCount::new(1).unwrap();
        let mut biased = vec![0i32; 4];
        let refs: [&[i32]; 1] = [&signed.data];
        cc.interleave(&refs, signed.adjust(), &mut biased);

        let mut unsigned = Plane {
            prec,
            signed: false,
            data: biased,
        };
        clip_plane(&mut unsigned, prec);
        assert_eq!(unsigned.data, [0, 127, 128, 255]);
    }

    #[test]
    fn test_scale_up_maps_full_range() {
        let mut plane = Plane {
            prec: 8,
            signed: false,
            data: vec![0, 1, 128, 255],
        };
        scale_plane(&mut plane, 16);
        assert_eq!(plane.prec, 16);
        assert_eq!(plane.data[0], 0);
        assert_eq!(plane.data[3], 65535);
        // 128 * 65535 / 255 = 32896
        assert_eq!(plane.data[2], 32896);
    }

    #[test]
    fn test_scale_down_is_right_shift() {
        let mut plane = Plane {
            prec: 12,
            signed: false,
            data: vec![0, 0x0FFF, 0x0800],
        };
        scale_plane(&mut plane, 8);
        assert_eq!(plane.data, [0, 0xFF, 0x80]);
    }

    #[test]
    fn test_scale_roundtrip_is_monotone() {
        let mut plane = Plane {
            prec: 8,
            signed: false,
            data: (0..=255).collect(),
        };
        scale_plane(&mut plane, 11);
        scale_plane(&mut plane, 8);

        assert!(
            plane.data.windows(2).all(|w| w[0] <= w[1]),
            "round-trip broke ordering"
        );
    }
}
