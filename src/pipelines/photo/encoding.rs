// SPDX-License-Identifier: GPL-3.0-only

//! Photo encoding
//!
//! Encodes captured RGBA frames to JPEG with quality control. CPU-bound
//! work runs on the blocking pool when called through
//! [`PhotoEncoder::encode`].

use crate::constants::DEFAULT_JPEG_QUALITY;
use crate::pipelines::{CaptureError, CaptureResult};
use image::{DynamicImage, RgbaImage};
use std::sync::Arc;
use tracing::debug;

/// JPEG photo encoder
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    jpeg_quality: u8,
}

impl PhotoEncoder {
    /// Create a new encoder with the default quality
    pub fn new() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// JPEG quality, clamped to 1-100
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Encode on the blocking pool
    pub async fn encode(&self, image: Arc<RgbaImage>) -> CaptureResult<Vec<u8>> {
        let encoder = *self;
        tokio::task::spawn_blocking(move || encoder.encode_sync(&image))
            .await
            .map_err(|e| CaptureError::TaskFailed(format!("Encoding task error: {}", e)))?
    }

    /// Encode on the calling thread
    pub fn encode_sync(&self, image: &RgbaImage) -> CaptureResult<Vec<u8>> {
        let data = encode_jpeg(image, self.jpeg_quality)?;
        debug!(size = data.len(), quality = self.jpeg_quality, "Encoding complete");
        Ok(data)
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// JPEG has no alpha channel, so frames are flattened to RGB first
fn encode_jpeg(image: &RgbaImage, quality: u8) -> CaptureResult<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
    encoder
        .encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| CaptureError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

    Ok(buffer)
}
