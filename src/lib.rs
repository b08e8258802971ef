// SPDX-License-Identifier: MPL-2.0

//! Snapshoot camera session manager
//!
//! Drives the lifecycle of a camera screen: acquiring the camera, running
//! the live preview, taking photos, recording short clips with a hard time
//! cap, and releasing the hardware whenever the screen goes away.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera backend abstraction and stream ownership
//! - [`pipelines`]: Photo and clip capture
//! - [`session`]: The session state machine and its handle
//! - [`lifecycle`]: Binding of a session to view lifecycle events
//! - [`auth`]: Signed-in user, preference store and remote API contract
//! - [`config`]: User configuration handling
//! - [`storage`]: Saving delivered media
//!
//! # Example
//!
//! ```no_run
//! use snapshoot_camera::backends::camera::{DeviceMediaSource, SyntheticBackend};
//! use snapshoot_camera::pipelines::CaptureEncoder;
//! use snapshoot_camera::session::{Session, SessionConfig, SessionEvent, SessionState};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = DeviceMediaSource::new(Arc::new(SyntheticBackend::new()));
//! let session = Session::spawn(SessionConfig::default(), source, CaptureEncoder::default());
//!
//! session.dispatch(SessionEvent::StartPreview)?;
//! session.wait_until(|s| s.state == SessionState::Live).await?;
//! session.dispatch(SessionEvent::CapturePhoto)?;
//! session.wait_until(|s| s.state == SessionState::Captured).await?;
//! let photo = session.deliver().await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod lifecycle;
pub mod pipelines;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use constants::PhotoQuality;
pub use errors::{AppError, AppResult, ErrorKind, SessionError};
pub use lifecycle::LifecycleGuard;
pub use session::{CapturedMedia, Session, SessionConfig, SessionEvent, SessionSnapshot, SessionState};
