//! Synthetic test-pattern source.
//!
//! Produces a moving RGB gradient encoded as JPEG, so the full pipeline
//! can run on machines without a camera (demos, CI, integration tests).

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use framecast_common::error::{FramecastError, FramecastResult};

use crate::{CaptureConfig, FrameSample, FrameSource};

/// A frame source that renders a shifting gradient instead of reading
/// hardware. Always ready; never reports `DeviceNotReady`.
pub struct TestPatternSource {
    config: CaptureConfig,
    frame_index: u64,
}

impl TestPatternSource {
    /// Create a test pattern source with the given configuration.
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            frame_index: 0,
        }
    }

    /// Number of frames produced so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frame_index
    }

    fn render_rgb(&self) -> Vec<u8> {
        let width = self.config.width();
        let height = self.config.height();
        let shift = (self.frame_index % 256) as u32;

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                rgb.push((((x * 256) / width + shift) % 256) as u8);
                rgb.push(((y * 256) / height) as u8);
                rgb.push((255 - shift) as u8);
            }
        }
        rgb
    }
}

#[async_trait::async_trait]
impl FrameSource for TestPatternSource {
    async fn grab(&mut self) -> FramecastResult<FrameSample> {
        let rgb = self.render_rgb();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.config.quality())
            .encode(
                &rgb,
                self.config.width(),
                self.config.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| FramecastError::capture(format!("JPEG encoding failed: {e}")))?;

        self.frame_index += 1;
        Ok(FrameSample::new(jpeg))
    }

    fn name(&self) -> &'static str {
        "test-pattern"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pattern_emits_jpeg_at_configured_size() {
        use image::GenericImageView;

        let mut source = TestPatternSource::new(
            CaptureConfig::default().with_width(64).with_height(48),
        );
        let sample = source.grab().await.unwrap();

        // JPEG SOI and EOI markers
        assert_eq!(&sample.data[..2], &[0xFF, 0xD8]);
        assert_eq!(&sample.data[sample.data.len() - 2..], &[0xFF, 0xD9]);
        assert!(sample.captured_at_ms > 0);

        let decoded = image::load_from_memory(&sample.data).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[tokio::test]
    async fn test_pattern_frames_differ() {
        let mut source = TestPatternSource::new(
            CaptureConfig::default().with_width(32).with_height(32),
        );
        let first = source.grab().await.unwrap();
        let second = source.grab().await.unwrap();

        assert_eq!(source.frames_rendered(), 2);
        assert_ne!(first.data, second.data);
        assert!(second.captured_at_ms >= first.captured_at_ms);
    }
}
