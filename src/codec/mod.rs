//! Sample-level conversion primitives shared by every container format.
//!
//! - `bitpack`: packing/unpacking between MSB-first N-bit packed bytes and
//!   unpacked 32-bit samples (1..=16 bits per sample).
//! - `planar`: conversion between planar (one buffer per channel) and
//!   interleaved (channel-major per pixel) sample layouts.
//! - `scale`: precision adaptation (clipping and proportional rescaling)
//!   on decoded component planes.

pub mod bitpack;
pub mod planar;
pub mod scale;
