//! Decoded frames.
//!
//! - `Frame`: one decoded picture with its decode index and presentation time.
//!
//! A frame lives for a single sampler step. Detectors borrow it; the only way
//! pixels leave the pipeline is `Frame::encode_jpeg`, which produces the
//! evidentiary still stored with a violation.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

/// Fallback when a container reports no usable frame rate.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// A decoded RGB frame.
///
/// Deliberately not `Clone`: the pixel buffer belongs to the sampler step that
/// produced it.
pub struct Frame {
    index: u64,
    presentation_time: f64,
    image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, presentation_time: f64, image: RgbImage) -> Self {
        Self {
            index,
            presentation_time,
            image,
        }
    }

    /// Position in decode order, starting at 0.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Seconds since the start of the video.
    pub fn presentation_time(&self) -> f64 {
        self.presentation_time
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// RGB pixels, row-major, 3 bytes per pixel.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Encode the frame as a JPEG still for evidence storage.
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
            .encode_image(&self.image)
            .with_context(|| format!("failed to JPEG-encode frame {}", self.index))?;
        Ok(out)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("presentation_time", &self.presentation_time)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}

/// True for a finite, strictly positive frame rate.
pub fn is_usable_frame_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// Replace a missing, zero, negative or non-finite frame rate with the
/// default. An unusable default falls back to `DEFAULT_FRAME_RATE`.
pub fn effective_frame_rate(reported: Option<f64>, default: f64) -> f64 {
    match reported {
        Some(rate) if is_usable_frame_rate(rate) => rate,
        _ if is_usable_frame_rate(default) => default,
        _ => DEFAULT_FRAME_RATE,
    }
}

/// Presentation time of the frame at `index`.
pub fn presentation_time(index: u64, frame_rate: f64) -> f64 {
    index as f64 / frame_rate
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn make_test_frame(index: u64) -> Frame {
        let image = RgbImage::from_pixel(16, 8, Rgb([200, 40, 10]));
        Frame::new(index, presentation_time(index, 25.0), image)
    }

    #[test]
    fn frame_reports_metadata() {
        let frame = make_test_frame(50);
        assert_eq!(frame.index(), 50);
        assert_eq!(frame.presentation_time(), 2.0);
        assert_eq!(frame.width(), 16);
        assert_eq!(frame.height(), 8);
    }

    #[test]
    fn jpeg_encoding_produces_jpeg_magic() {
        let frame = make_test_frame(0);
        let bytes = frame.encode_jpeg(90).unwrap();
        assert!(bytes.len() > 4);
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 8);
    }

    #[test]
    fn frame_rate_falls_back_when_unusable() {
        assert_eq!(effective_frame_rate(Some(25.0), 30.0), 25.0);
        assert_eq!(effective_frame_rate(Some(0.0), 30.0), 30.0);
        assert_eq!(effective_frame_rate(Some(-5.0), 30.0), 30.0);
        assert_eq!(effective_frame_rate(Some(f64::NAN), 30.0), 30.0);
        assert_eq!(effective_frame_rate(None, 30.0), 30.0);
    }

    #[test]
    fn unusable_default_rate_falls_back_to_thirty() {
        assert_eq!(effective_frame_rate(Some(0.0), 0.0), DEFAULT_FRAME_RATE);
        assert_eq!(effective_frame_rate(None, f64::NAN), DEFAULT_FRAME_RATE);
        assert_eq!(effective_frame_rate(None, f64::INFINITY), DEFAULT_FRAME_RATE);
        assert_eq!(effective_frame_rate(Some(12.0), 0.0), 12.0);
    }

    #[test]
    fn presentation_time_is_index_over_rate() {
        assert_eq!(presentation_time(0, 30.0), 0.0);
        assert_eq!(presentation_time(300, 30.0), 10.0);
        assert_eq!(presentation_time(15, 30.0), 0.5);
    }
}
