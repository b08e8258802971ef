// SPDX-License-Identifier: GPL-3.0-only

//! Device media source
//!
//! The source provides:
//! - Serialized acquisition (one hardware claim at a time, FIFO waiters)
//! - Idempotent release, safe from racing teardown paths
//! - Release-on-drop as a last resort

use super::CameraBackend;
use super::types::*;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

/// Camera + microphone acquisition over a platform backend
///
/// Cloning shares the same hardware claim, so clones still serialize
/// against each other.
#[derive(Clone)]
pub struct DeviceMediaSource {
    backend: Arc<dyn CameraBackend>,
    /// Single permit held by whichever handle currently owns the hardware
    claim: Arc<Semaphore>,
}

impl DeviceMediaSource {
    /// Create a source over a backend
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        info!(backend = backend.name(), "Creating device media source");
        Self {
            backend,
            claim: Arc::new(Semaphore::new(1)),
        }
    }

    /// Backend name
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Acquire a stream for the requested facing
    ///
    /// Waits until any previously acquired handle has been released, so two
    /// handles from the same source are never open at once. Failures are
    /// returned as-is and never retried here.
    pub async fn acquire(&self, facing: Facing, wants_audio: bool) -> BackendResult<StreamHandle> {
        let permit = Arc::clone(&self.claim)
            .acquire_owned()
            .await
            .map_err(|_| BackendError::Other("Media source closed".to_string()))?;

        debug!(%facing, audio = wants_audio, "Requesting camera stream");

        let opened = self
            .backend
            .open(StreamRequest {
                facing,
                audio: wants_audio,
            })
            .await
            .inspect_err(|e| warn!(%facing, error = %e, "Camera stream request failed"))?;

        info!(stream = %opened.id, %facing, audio = opened.has_audio, "Camera stream acquired");

        Ok(StreamHandle {
            id: opened.id,
            facing,
            has_audio: opened.has_audio,
            frames: opened.frames,
            backend: Arc::clone(&self.backend),
            permit: Mutex::new(Some(permit)),
            released: AtomicBool::new(false),
        })
    }

    /// Release a stream
    ///
    /// Idempotent: returns `true` only for the call that actually stopped the
    /// stream. Backend failures are logged, never returned.
    pub fn release(&self, handle: &StreamHandle) -> bool {
        handle.release()
    }

    /// Whether a handle currently holds the hardware
    pub fn is_claimed(&self) -> bool {
        self.claim.available_permits() == 0
    }
}

impl std::fmt::Debug for DeviceMediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceMediaSource")
            .field("backend", &self.backend.name())
            .field("claimed", &self.is_claimed())
            .finish()
    }
}

/// Exclusive ownership of an open camera stream
///
/// Not `Clone`: whoever holds the handle owns the hardware. Consumers that
/// only need frames get a [`PreviewStream`] instead.
pub struct StreamHandle {
    id: StreamId,
    facing: Facing,
    has_audio: bool,
    frames: FrameReceiver,
    backend: Arc<dyn CameraBackend>,
    permit: Mutex<Option<OwnedSemaphorePermit>>,
    released: AtomicBool,
}

impl StreamHandle {
    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    /// Whether the stream has been stopped
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// A fresh receiver for this stream's frames
    pub fn frames(&self) -> FrameReceiver {
        self.frames.clone()
    }

    /// Frame view for a preview surface
    pub fn preview(&self) -> PreviewStream {
        PreviewStream {
            stream: self.id,
            mirrored: self.facing.is_mirrored(),
            frames: self.frames.clone(),
        }
    }

    fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            debug!(stream = %self.id, "Stream already released");
            return false;
        }

        if let Err(e) = self.backend.close(self.id) {
            warn!(stream = %self.id, error = %e, "Failed to close camera stream");
        }

        // Hand the hardware claim to the next waiter
        match self.permit.lock() {
            Ok(mut permit) => drop(permit.take()),
            Err(poisoned) => drop(poisoned.into_inner().take()),
        }

        info!(stream = %self.id, "Camera stream released");
        true
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        if !self.is_released() {
            warn!(stream = %self.id, "Stream handle dropped while open, releasing");
            self.release();
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.id)
            .field("facing", &self.facing)
            .field("has_audio", &self.has_audio)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Read-only frame view of the live stream
///
/// Holding one does not keep the hardware open; once the stream is released
/// the receiver simply stops seeing new frames.
#[derive(Debug, Clone)]
pub struct PreviewStream {
    pub stream: StreamId,
    /// Display horizontally flipped (front camera)
    pub mirrored: bool,
    pub frames: FrameReceiver,
}

impl PartialEq for PreviewStream {
    fn eq(&self, other: &Self) -> bool {
        self.stream == other.stream && self.mirrored == other.mirrored
    }
}
