// SPDX-License-Identifier: MPL-2.0

//! Capture pipelines for photos and clips
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Live stream  │ ──▶ │  Photo Pipeline   │ ──▶ │ ImageBuffer  │
//! │   (RGBA)     │     │  - Mirror (front) │     │   (JPEG)     │
//! │              │     │  - Encoding       │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//!
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Live stream  │ ──▶ │  Clip Recorder    │ ──▶ │  ClipBuffer  │
//! │   (RGBA)     │     │  - Chunk per frame│     │   (MJPEG)    │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`photo`]: Still capture and encoding
//! - [`video`]: Clip recording

pub mod photo;
pub mod video;

pub use photo::{ImageBuffer, PhotoCapture, PhotoEncoder};
pub use video::{ClipBuffer, ClipRecorder, RecordingHandle};

use crate::backends::camera::{Facing, StreamHandle};
use crate::constants::{DEFAULT_JPEG_QUALITY, STILL_FRAME_TIMEOUT_MS};
use crate::errors::ErrorKind;
use std::fmt;
use std::time::Duration;

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Capture errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// No frame arrived within the capture timeout
    NoFrameAvailable,
    /// The stream stopped while waiting for a frame
    StreamClosed,
    /// Frame geometry does not match its buffer
    InvalidFrame(String),
    /// Encoding failed
    EncodingFailed(String),
    /// A recording was stopped before any chunk was buffered
    EmptyClip,
    /// Background task failed
    TaskFailed(String),
}

impl CaptureError {
    /// Session-level failure kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaptureError::EmptyClip => ErrorKind::RecordingProducedEmptyClip,
            _ => ErrorKind::CaptureFailed,
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoFrameAvailable => write!(f, "No frame available for capture"),
            CaptureError::StreamClosed => write!(f, "Stream closed during capture"),
            CaptureError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            CaptureError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            CaptureError::EmptyClip => write!(f, "Recording produced an empty clip"),
            CaptureError::TaskFailed(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Turns live streams into deliverable media
///
/// Stateless apart from its settings; recordings are tracked by the
/// [`RecordingHandle`] it returns.
#[derive(Debug, Clone, Copy)]
pub struct CaptureEncoder {
    photo: PhotoEncoder,
    frame_timeout: Duration,
}

impl CaptureEncoder {
    pub fn new(jpeg_quality: u8, frame_timeout: Duration) -> Self {
        Self {
            photo: PhotoEncoder::new().with_jpeg_quality(jpeg_quality),
            frame_timeout,
        }
    }

    /// Snapshot the current frame, mirrored for the front camera
    ///
    /// The returned future only borrows the stream's frames, not the handle,
    /// so it can run on its own task while the owner keeps the handle.
    pub fn capture_still(
        &self,
        handle: &StreamHandle,
        facing: Facing,
    ) -> impl Future<Output = CaptureResult<ImageBuffer>> + Send + 'static {
        let stream = handle.id();
        let frames = handle.frames();
        let photo = self.photo;
        let frame_timeout = self.frame_timeout;
        async move { PhotoCapture::capture(stream, frames, facing, &photo, frame_timeout).await }
    }

    /// Begin buffering chunks; nothing is emitted until stopped
    pub fn start_recording(&self, handle: &StreamHandle) -> RecordingHandle {
        ClipRecorder::start(handle, self.photo)
    }

    /// Finalize a recording
    pub async fn stop_recording(&self, recording: RecordingHandle) -> CaptureResult<ClipBuffer> {
        ClipRecorder::stop(recording).await
    }

    /// Throw a recording away
    pub fn abort_recording(&self, recording: RecordingHandle) {
        ClipRecorder::abort(recording);
    }
}

impl Default for CaptureEncoder {
    fn default() -> Self {
        Self::new(
            DEFAULT_JPEG_QUALITY,
            Duration::from_millis(STILL_FRAME_TIMEOUT_MS),
        )
    }
}
