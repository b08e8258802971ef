// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   Session (actor)   │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  DeviceMediaSource  │  ← Serialized acquire, idempotent release
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Platform seam
//! └──────────┬──────────┘
//!            │
//!            ▼
//!      ┌───────────┐
//!      │ Synthetic │  ← Test pattern / still image source
//!      └───────────┘
//! ```

pub mod source;
pub mod synthetic;
pub mod types;

pub use source::{DeviceMediaSource, PreviewStream, StreamHandle};
pub use synthetic::{SyntheticBackend, SyntheticStats};
pub use types::*;

use async_trait::async_trait;

/// Platform camera access
///
/// Backends only open and close streams. Serialization of acquisitions and
/// idempotent release are layered on top by [`DeviceMediaSource`], so a
/// backend may assume `close` is called at most once per opened stream.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Open a camera (and optionally microphone) stream
    ///
    /// May prompt the user for permission. Permission results are cached by
    /// the platform, not here.
    async fn open(&self, request: StreamRequest) -> BackendResult<OpenedStream>;

    /// Stop a stream and release the device
    fn close(&self, id: StreamId) -> BackendResult<()>;

    /// Human readable backend name for logs
    fn name(&self) -> &str;
}
