use crate::error::RasterError;

/// One channel of an image, unpacked to one `i32` per sample.
#[derive(Debug, Clone, Default)]
pub struct Plane {
    /// Bit precision of the samples (1..=16), independent of storage width.
    pub prec: u8,
    /// true if samples are signed, false if unsigned.
    pub signed: bool,
    /// Sample values, row-major, `width * height` entries.
    pub data: Vec<i32>,
}

impl Plane {
    pub fn new(prec: u8, signed: bool, len: usize) -> Self {
        Self {
            prec,
            signed,
            data: vec![0; len],
        }
    }

    /// Additive bias that maps this plane's sample domain onto the
    /// unsigned packed domain: `1 << (prec - 1)` for signed planes, 0 otherwise.
    pub fn adjust(&self) -> i32 {
        if self.signed { 1 << (self.prec - 1) } else { 0 }
    }
}

/// A decoded raster image: per-channel planes of unpacked 32-bit samples.
#[derive(Debug, Clone, Default)]
pub struct RasterImage {
    /// Width of the image in pixels.
    pub width: u32,
    /// Height of the image in pixels.
    pub height: u32,
    /// Color/alpha channels in interleave order.
    pub planes: Vec<Plane>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, planes: Vec<Plane>) -> Self {
        Self {
            width,
            height,
            planes,
        }
    }

    pub fn component_count(&self) -> usize {
        self.planes.len()
    }

    /// Channel layout implied by the component count, if it maps to one.
    pub fn color_model(&self) -> Option<crate::ColorModel> {
        crate::ColorModel::try_from(self.planes.len() as u8).ok()
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Every plane must hold exactly `width * height` samples.
    pub fn validate(&self) -> Result<(), RasterError> {
        if self.width == 0 || self.height == 0 {
            return Err(RasterError::InvalidArgumentSize);
        }
        if self.planes.is_empty() || self.planes.len() > crate::constants::MAXIMUM_COMPONENT_COUNT {
            return Err(RasterError::InvalidArgumentComponentCount);
        }
        let expected = self.pixel_count();
        for plane in &self.planes {
            if plane.data.len() != expected {
                return Err(RasterError::InvalidArgumentSize);
            }
            if plane.prec < crate::constants::MINIMUM_BITS_PER_SAMPLE
                || plane.prec > crate::constants::MAXIMUM_BITS_PER_SAMPLE
            {
                return Err(RasterError::InvalidArgumentBitsPerSample);
            }
        }
        Ok(())
    }
}

/// Geometry and sample description for headerless containers and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: u8,
    pub component_count: u8,
    pub signed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_adjust() {
        let signed = Plane::new(8, true, 4);
        assert_eq!(signed.adjust(), 128);

        let unsigned = Plane::new(12, false, 4);
        assert_eq!(unsigned.adjust(), 0);
    }

    #[test]
    fn test_validate_rejects_short_plane() {
        let image = RasterImage::new(4, 4, vec![Plane::new(8, false, 15)]);
        assert!(image.validate().is_err());

        let image = RasterImage::new(4, 4, vec![Plane::new(8, false, 16)]);
        assert!(image.validate().is_ok());
    }
}
