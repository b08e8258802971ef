// SPDX-License-Identifier: MPL-2.0

//! Clip recording pipeline
//!
//! Records a live stream into a buffered clip while preview continues.
//! Stopping is always driven from outside: the session's 1 Hz timer enforces
//! the maximum duration.

pub mod recorder;

pub use recorder::{ClipBuffer, ClipRecorder, RecordingHandle, decode_clip};
