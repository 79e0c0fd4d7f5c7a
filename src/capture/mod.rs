//! Capture sources and frame encoding. A [`FrameSource`] owns a live media
//! device handle; the sampling loop pulls one still frame per tick and
//! serializes it to JPEG before upload.

use std::io::Cursor;

use anyhow::{Context, Result};
use image::{codecs::jpeg::JpegEncoder, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// A camera or other continuously-updating visual signal.
///
/// `open` acquires exclusive access to the device; failure is terminal for
/// the session and only the user retries. `grab` may block while the device
/// delivers a frame and is always called off the async executor. `release`
/// must be idempotent, and implementations should also release the device in
/// `Drop` so a torn-down session never leaks the handle.
pub trait FrameSource: Send + 'static {
    fn open(&mut self) -> Result<()>;
    fn resolution(&self) -> Resolution;
    fn grab(&mut self) -> Result<RgbImage>;
    fn release(&mut self);
}

/// Deterministic software frame source for tests and local development:
/// a gradient that drifts one step per grabbed frame.
pub struct SyntheticSource {
    resolution: Resolution,
    frame_index: u32,
    opened: bool,
}

impl SyntheticSource {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            frame_index: 0,
            opened: false,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn open(&mut self) -> Result<()> {
        self.opened = true;
        Ok(())
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn grab(&mut self) -> Result<RgbImage> {
        anyhow::ensure!(self.opened, "synthetic source grabbed before open");
        let shift = self.frame_index;
        self.frame_index = self.frame_index.wrapping_add(1);

        let frame = RgbImage::from_fn(self.resolution.width, self.resolution.height, |x, y| {
            Rgb([
                ((x + shift) % 256) as u8,
                ((y + shift) % 256) as u8,
                ((x + y) % 256) as u8,
            ])
        });
        Ok(frame)
    }

    fn release(&mut self) {
        self.opened = false;
    }
}

pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Serialize one frame to JPEG at the given quality (0-100).
pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), quality);
    frame
        .write_with_encoder(encoder)
        .context("failed to encode frame as jpeg")?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_source_produces_native_resolution_frames() {
        let mut source = SyntheticSource::new(Resolution {
            width: 64,
            height: 48,
        });
        source.open().unwrap();
        let frame = source.grab().unwrap();
        assert_eq!((frame.width(), frame.height()), (64, 48));
    }

    #[test]
    fn grab_before_open_fails() {
        let mut source = SyntheticSource::new(Resolution {
            width: 8,
            height: 8,
        });
        assert!(source.grab().is_err());
    }

    #[test]
    fn encoded_frame_is_valid_jpeg() {
        let mut source = SyntheticSource::new(Resolution {
            width: 32,
            height: 32,
        });
        source.open().unwrap();
        let frame = source.grab().unwrap();
        let bytes = encode_jpeg(&frame, DEFAULT_JPEG_QUALITY).unwrap();
        assert!(!bytes.is_empty());
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 32));
    }
}
