//! Planar / interleaved sample layout conversion.
//!
//! Container formats store the channels of one pixel contiguously
//! (interleaved); the decoded image model keeps one buffer per channel
//! (planar). Conversion is dispatched on a validated channel count with
//! the per-count loops unrolled.

use crate::constants::{MAXIMUM_COMPONENT_COUNT, MINIMUM_COMPONENT_COUNT};

/// Validated channel-count descriptor for layout conversion.
///
/// Counts outside 1..=4 have no conversion variant and `new` returns
/// `None` for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCount(u8);

impl ChannelCount {
    pub fn new(count: u8) -> Option<Self> {
        if (MINIMUM_COMPONENT_COUNT..=MAXIMUM_COMPONENT_COUNT).contains(&(count as usize)) {
            Some(Self(count))
        } else {
            None
        }
    }

    pub fn count(self) -> usize {
        self.0 as usize
    }

    /// Split an interleaved buffer into per-channel planes:
    /// `planes[c][i] = src[i * count + c]`.
    ///
    /// `src` holds `len * count` samples for plane length `len`; each
    /// destination plane holds `len` samples.
    pub fn deinterleave(self, src: &[i32], planes: &mut [&mut [i32]]) {
        debug_assert_eq!(planes.len(), self.count());
        match self.0 {
            1 => {
                planes[0].copy_from_slice(src);
            }
            2 => {
                let [p0, p1] = planes else { unreachable!() };
                for (i, px) in src.chunks_exact(2).enumerate() {
                    p0[i] = px[0];
                    p1[i] = px[1];
                }
            }
            3 => {
                let [p0, p1, p2] = planes else { unreachable!() };
                for (i, px) in src.chunks_exact(3).enumerate() {
                    p0[i] = px[0];
                    p1[i] = px[1];
                    p2[i] = px[2];
                }
            }
            _ => {
                let [p0, p1, p2, p3] = planes else {
                    unreachable!()
                };
                for (i, px) in src.chunks_exact(4).enumerate() {
                    p0[i] = px[0];
                    p1[i] = px[1];
                    p2[i] = px[2];
                    p3[i] = px[3];
                }
            }
        }
    }

    /// Merge per-channel planes into an interleaved buffer, adding
    /// `adjust` to every sample: `dst[i * count + c] = planes[c][i] + adjust`.
    ///
    /// `adjust` re-biases a signed sample domain into the unsigned domain
    /// expected by the packed wire format (see [`Plane::adjust`]).
    ///
    /// [`Plane::adjust`]: crate::image::Plane::adjust
    pub fn interleave(self, planes: &[&[i32]], adjust: i32, dst: &mut [i32]) {
        debug_assert_eq!(planes.len(), self.count());
        match self.0 {
            1 => {
                for (d, s) in dst.iter_mut().zip(planes[0]) {
                    *d = *s + adjust;
                }
            }
            2 => {
                let [p0, p1] = planes else { unreachable!() };
                for (i, px) in dst.chunks_exact_mut(2).enumerate() {
                    px[0] = p0[i] + adjust;
                    px[1] = p1[i] + adjust;
                }
            }
            3 => {
                let [p0, p1, p2] = planes else { unreachable!() };
                for (i, px) in dst.chunks_exact_mut(3).enumerate() {
                    px[0] = p0[i] + adjust;
                    px[1] = p1[i] + adjust;
                    px[2] = p2[i] + adjust;
                }
            }
            _ => {
                let [p0, p1, p2, p3] = planes else {
                    unreachable!()
                };
                for (i, px) in dst.chunks_exact_mut(4).enumerate() {
                    px[0] = p0[i] + adjust;
                    px[1] = p1[i] + adjust;
                    px[2] = p2[i] + adjust;
                    px[3] = p3[i] + adjust;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane_values(seed: u32, length: usize) -> Vec<i32> {
        let mut state = seed;
        (0..length)
            .map(|_| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                ((state >> 8) & 0xFF) as i32
            })
            .collect()
    }

    #[test]
    fn test_unsupported_counts_have_no_entry() {
        assert!(ChannelCount::new(0).is_none());
        assert!(ChannelCount::new(5).is_none());
        for c in 1..=4 {
            assert!(ChannelCount::new(c).is_some());
        }
    }

    #[test]
    fn test_deinterleave_positions() {
        let cc = ChannelCount::new(3).unwrap();
        let src = [10, 20, 30, 11, 21, 31];
        let mut r = [0i32; 2];
        let mut g = [0i32; 2];
        let mut b = [0i32; 2];
        let mut refs: [&mut [i32]; 3] = [&mut r, &mut g, &mut b];
        cc.deinterleave(&src, &mut refs);
        assert_eq!(r, [10, 11]);
        assert_eq!(g, [20, 21]);
        assert_eq!(b, [30, 31]);
    }

    #[test]
    fn test_interleave_deinterleave_inverse() {
        let length = 37;
        for count in 1..=4u8 {
            let cc = ChannelCount::new(count).unwrap();
            let planes: Vec<Vec<i32>> = (0..count)
                .map(|c| plane_values(0xBEEF + c as u32, length))
                .collect();

            let mut interleaved = vec![0i32; length * cc.count()];
            let refs: Vec<&[i32]> = planes.iter().map(|p| p.as_slice()).collect();
            cc.interleave(&refs, 0, &mut interleaved);

            let mut out: Vec<Vec<i32>> = vec![vec![0i32; length]; cc.count()];
            {
                let mut refs: Vec<&mut [i32]> =
                    out.iter_mut().map(|p| p.as_mut_slice()).collect();
                cc.deinterleave(&interleaved, &mut refs);
            }
            assert_eq!(out, planes, "inverse failed for {} channels", count);
        }
    }

    #[test]
    fn test_interleave_applies_adjust() {
        let cc = ChannelCount::new(2).unwrap();
        let gray = [-128, 0, 127];
        let alpha = [-1, -1, -1];
        let mut dst = [0i32; 6];
        let refs: [&[i32]; 2] = [&gray, &alpha];
        cc.interleave(&refs, 128, &mut dst);
        assert_eq!(dst, [0, 127, 128, 127, 255, 127]);
    }

    #[test]
    fn test_rgb_white_packs_to_ff_bytes() {
        // Three white RGB pixels at 8 bits: interleave then pack must give
        // nine 0xFF bytes.
        use crate::codec::bitpack::BitDepth;

        let cc = ChannelCount::new(3).unwrap();
        let white = [255, 255, 255];
        let mut interleaved = vec![0i32; 9];
        let refs: [&[i32]; 3] = [&white, &white, &white];
        cc.interleave(&refs, 0, &mut interleaved);

        let depth = BitDepth::new(8).unwrap();
        let mut packed = vec![0u8; 9];
        depth.pack(&interleaved, &mut packed);
        assert_eq!(packed, [0xFF; 9]);
    }
}
