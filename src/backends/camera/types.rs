// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::errors::ErrorKind;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Which physical camera a stream is requested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// User-facing ("selfie") camera
    #[default]
    Front,
    /// Environment-facing camera
    Rear,
}

impl Facing {
    /// The other camera
    pub fn flipped(self) -> Self {
        match self {
            Facing::Front => Facing::Rear,
            Facing::Rear => Facing::Front,
        }
    }

    /// Whether previews and stills from this camera are shown mirrored
    pub fn is_mirrored(self) -> bool {
        matches!(self, Facing::Front)
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facing::Front => write!(f, "front"),
            Facing::Rear => write!(f, "rear"),
        }
    }
}

impl std::str::FromStr for Facing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "front" | "user" => Ok(Facing::Front),
            "rear" | "back" | "environment" => Ok(Facing::Rear),
            other => Err(format!("Unknown facing '{}'", other)),
        }
    }
}

/// Identifier of an open platform stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl StreamId {
    /// Allocate a process-unique stream id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        StreamId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Parameters for opening a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub facing: Facing,
    pub audio: bool,
}

/// A single RGBA frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA pixels, `stride` bytes per row
    pub data: Arc<[u8]>,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// Frame counter within its stream
    pub sequence: u64,
    /// When the frame was produced
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a frame from a tightly packed RGBA image
    pub fn from_rgba(image: &RgbaImage, sequence: u64) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            data: Arc::from(image.as_raw().as_slice()),
            stride: image.width() * 4,
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Copy the frame into an `RgbaImage`, dropping any row padding
    ///
    /// Returns `None` if the buffer is shorter than the declared geometry.
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        let row_bytes = self.width as usize * 4;
        let stride = self.stride as usize;
        let height = self.height as usize;
        // Last row needs no padding
        let needed = stride * height.saturating_sub(1) + row_bytes;
        if stride < row_bytes || self.data.len() < needed {
            return None;
        }

        let pixels = if stride == row_bytes {
            self.data[..row_bytes * height].to_vec()
        } else {
            let mut packed = Vec::with_capacity(row_bytes * height);
            for row in self.data.chunks(stride).take(height) {
                packed.extend_from_slice(&row[..row_bytes]);
            }
            packed
        };

        RgbaImage::from_raw(self.width, self.height, pixels)
    }
}

/// Latest-frame receiver for a stream; `None` until the first frame is drawn
pub type FrameReceiver = tokio::sync::watch::Receiver<Option<Arc<CameraFrame>>>;

/// Sender half held by the backend's frame producer
pub type FrameSender = tokio::sync::watch::Sender<Option<Arc<CameraFrame>>>;

/// What a backend returns for a granted stream
#[derive(Debug)]
pub struct OpenedStream {
    pub id: StreamId,
    pub frames: FrameReceiver,
    pub has_audio: bool,
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Access to the camera or microphone was refused
    PermissionDenied,
    /// No device for the requested facing, or it is busy
    DeviceUnavailable(String),
    /// The stream is not open on this backend
    UnknownStream(StreamId),
    /// Other errors
    Other(String),
}

impl BackendError {
    /// Session-level failure kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::DeviceUnavailable,
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::PermissionDenied => write!(f, "Permission denied"),
            BackendError::DeviceUnavailable(msg) => write!(f, "Device unavailable: {}", msg),
            BackendError::UnknownStream(id) => write!(f, "Unknown stream: {}", id),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}
