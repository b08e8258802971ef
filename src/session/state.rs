// SPDX-License-Identifier: GPL-3.0-only

//! Session states, events and snapshots

use crate::backends::camera::{Facing, PreviewStream};
use crate::constants::{DEFAULT_JPEG_QUALITY, MAX_RECORDING_SECONDS, STILL_FRAME_TIMEOUT_MS};
use crate::errors::ErrorKind;
use crate::pipelines::{ClipBuffer, ImageBuffer};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// No hardware held
    #[default]
    Idle,
    /// Waiting for the camera to be granted
    Requesting,
    /// Preview running
    Live,
    /// Taking a still
    Capturing,
    /// Buffering a clip
    Recording,
    /// Media waiting to be delivered or discarded
    Captured,
    /// Acquire or capture failed
    Error,
}

impl SessionState {
    /// States in which the session owns an open stream
    pub fn holds_stream(&self) -> bool {
        matches!(
            self,
            SessionState::Live | SessionState::Capturing | SessionState::Recording
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Requesting => "requesting",
            SessionState::Live => "live",
            SessionState::Capturing => "capturing",
            SessionState::Recording => "recording",
            SessionState::Captured => "captured",
            SessionState::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// User and lifecycle events accepted by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionEvent {
    StartPreview,
    CapturePhoto,
    StartRecording,
    StopRecording,
    SwitchFacing,
    /// Drop captured media and go live again with the same camera
    Discard,
    /// Hand captured media over and go idle
    Deliver,
    /// Release everything
    Teardown,
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Payload of captured media
#[derive(Debug, Clone)]
pub enum MediaContent {
    Image(ImageBuffer),
    Clip(ClipBuffer),
}

/// A finished photo or clip
#[derive(Debug, Clone)]
pub struct CapturedMedia {
    pub id: Uuid,
    pub captured_at: DateTime<Local>,
    /// Camera the media came from
    pub facing: Facing,
    pub content: MediaContent,
}

impl CapturedMedia {
    pub fn image(image: ImageBuffer, facing: Facing) -> Self {
        Self::new(MediaContent::Image(image), facing)
    }

    pub fn clip(clip: ClipBuffer, facing: Facing) -> Self {
        Self::new(MediaContent::Clip(clip), facing)
    }

    fn new(content: MediaContent, facing: Facing) -> Self {
        Self {
            id: Uuid::new_v4(),
            captured_at: Local::now(),
            facing,
            content,
        }
    }

    pub fn mime(&self) -> &'static str {
        match &self.content {
            MediaContent::Image(image) => image.mime,
            MediaContent::Clip(clip) => clip.mime,
        }
    }

    pub fn is_clip(&self) -> bool {
        matches!(self.content, MediaContent::Clip(_))
    }

    /// Encoded bytes, ready to be written out
    pub fn bytes(&self) -> Vec<u8> {
        match &self.content {
            MediaContent::Image(image) => image.data.to_vec(),
            MediaContent::Clip(clip) => clip.to_bytes(),
        }
    }
}

/// Observable session state
///
/// Optional fields are populated only in the state they belong to:
/// `recording_elapsed_seconds` in `Recording`, `captured_media` in
/// `Captured`, `error_kind` in `Error`, `preview` while a stream is held.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub facing: Facing,
    pub recording_elapsed_seconds: Option<u32>,
    pub captured_media: Option<CapturedMedia>,
    pub error_kind: Option<ErrorKind>,
    pub preview: Option<PreviewStream>,
    /// Increases by one with every published snapshot
    pub revision: u64,
}

/// Per-session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Recording is stopped automatically at this many seconds
    pub max_recording_seconds: u32,
    pub initial_facing: Facing,
    /// Request a microphone along with the camera
    pub capture_audio: bool,
    pub jpeg_quality: u8,
    /// How long a still capture waits for a first frame
    pub still_frame_timeout_ms: u64,
}

impl SessionConfig {
    pub fn still_frame_timeout(&self) -> Duration {
        Duration::from_millis(self.still_frame_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_recording_seconds: MAX_RECORDING_SECONDS,
            initial_facing: Facing::Front,
            capture_audio: true,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            still_frame_timeout_ms: STILL_FRAME_TIMEOUT_MS,
        }
    }
}
