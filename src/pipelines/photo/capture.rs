// SPDX-License-Identifier: MPL-2.0

//! Still capture from a live stream
//!
//! Grabs the most recent frame of the stream (waiting for the first one if
//! the stream was just opened), mirrors it for the front camera and encodes
//! it.

use super::encoding::PhotoEncoder;
use crate::backends::camera::{CameraFrame, Facing, FrameReceiver, StreamId};
use crate::constants::mime;
use crate::pipelines::{CaptureError, CaptureResult};
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A captured photo
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    /// Mime type of `data`
    pub mime: &'static str,
    /// Whether the pixels were flipped horizontally to match the preview
    pub mirrored: bool,
    /// Pixels as the user saw them
    pub pixels: Arc<RgbaImage>,
    /// Encoded image
    pub data: Arc<[u8]>,
}

/// Photo capture handler
pub struct PhotoCapture;

impl PhotoCapture {
    /// Snapshot the current frame of a stream
    ///
    /// Front-camera stills are mirrored so they match the selfie preview.
    pub async fn capture(
        stream: StreamId,
        mut frames: FrameReceiver,
        facing: Facing,
        encoder: &PhotoEncoder,
        frame_timeout: Duration,
    ) -> CaptureResult<ImageBuffer> {
        info!(%stream, %facing, "Capturing still");

        let frame = latest_frame(&mut frames, frame_timeout).await?;
        let pixels = Arc::new(Self::render(&frame, facing)?);
        let data = encoder.encode(Arc::clone(&pixels)).await?;

        debug!(
            width = pixels.width(),
            height = pixels.height(),
            size = data.len(),
            "Still captured"
        );

        Ok(ImageBuffer {
            width: pixels.width(),
            height: pixels.height(),
            mime: mime::IMAGE_JPEG,
            mirrored: facing.is_mirrored(),
            pixels,
            data: Arc::from(data),
        })
    }

    /// Frame to user-visible pixels
    pub fn render(frame: &CameraFrame, facing: Facing) -> CaptureResult<RgbaImage> {
        let mut image = frame.to_rgba_image().ok_or_else(|| {
            CaptureError::InvalidFrame(format!(
                "{}x{} frame with stride {} and {} bytes",
                frame.width,
                frame.height,
                frame.stride,
                frame.data.len()
            ))
        })?;

        if facing.is_mirrored() {
            image::imageops::flip_horizontal_in_place(&mut image);
        }
        Ok(image)
    }
}

/// Current frame, or the next one if nothing has been drawn yet
async fn latest_frame(
    frames: &mut FrameReceiver,
    frame_timeout: Duration,
) -> CaptureResult<Arc<CameraFrame>> {
    let current = frames.borrow_and_update().clone();
    if let Some(frame) = current {
        return Ok(frame);
    }

    match tokio::time::timeout(frame_timeout, frames.wait_for(Option::is_some)).await {
        Ok(Ok(frame)) => frame.clone().ok_or(CaptureError::NoFrameAvailable),
        Ok(Err(_)) => Err(CaptureError::StreamClosed),
        Err(_) => Err(CaptureError::NoFrameAvailable),
    }
}
