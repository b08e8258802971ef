// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest clip a session will record before stopping on its own
pub const MAX_RECORDING_SECONDS: u32 = 10;

/// Recording timer period
pub const RECORDING_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// JPEG quality for still captures (matches a 0.95 canvas export)
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// How long a still capture waits for the first frame of a fresh stream
pub const STILL_FRAME_TIMEOUT_MS: u64 = 2_000;

/// Photo output quality presets
///
/// `High` is what the capture pipeline uses unless configured otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PhotoQuality {
    /// Smaller files, visible artifacts
    Low,
    /// Balanced
    Medium,
    /// Near-lossless (default)
    #[default]
    High,
}

impl PhotoQuality {
    /// Get all preset variants for iteration
    pub const ALL: [PhotoQuality; 3] = [PhotoQuality::Low, PhotoQuality::Medium, PhotoQuality::High];

    /// Get display name for the preset
    pub fn display_name(&self) -> &'static str {
        match self {
            PhotoQuality::Low => "Low",
            PhotoQuality::Medium => "Medium",
            PhotoQuality::High => "High",
        }
    }

    /// JPEG quality value (0-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            PhotoQuality::Low => 60,
            PhotoQuality::Medium => 80,
            PhotoQuality::High => DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Mime types attached to captured media
pub mod mime {
    /// Still captures
    pub const IMAGE_JPEG: &str = "image/jpeg";

    /// Recorded clips: one JPEG chunk per frame
    pub const VIDEO_MJPEG: &str = "video/x-motion-jpeg";

    /// File extension for a mime type
    pub fn extension(mime: &str) -> &'static str {
        match mime {
            IMAGE_JPEG => "jpg",
            VIDEO_MJPEG => "mjpeg",
            _ => "bin",
        }
    }
}

/// Synthetic camera defaults
pub mod synthetic {
    use super::Duration;

    /// Frame width of the generated test pattern
    pub const FRAME_WIDTH: u32 = 640;

    /// Frame height of the generated test pattern
    pub const FRAME_HEIGHT: u32 = 480;

    /// Frames per second
    pub const FRAMERATE: u32 = 30;

    /// Simulated time for the platform to grant a stream
    pub const OPEN_LATENCY: Duration = Duration::from_millis(50);

    /// Interval between generated frames
    pub fn frame_interval(framerate: u32) -> Duration {
        Duration::from_millis(1_000 / u64::from(framerate.max(1)))
    }
}

/// Media storage naming
pub mod storage {
    /// Folder created under the pictures/videos directories
    pub const DEFAULT_SAVE_FOLDER: &str = "Snapshoot";

    /// File name prefix for photos
    pub const PHOTO_PREFIX: &str = "IMG";

    /// File name prefix for clips
    pub const VIDEO_PREFIX: &str = "VID";
}

/// Preference keys used by the auth context
pub mod preference_keys {
    pub const CURRENT_USER: &str = "currentUser";
    pub const AUTH_TOKEN: &str = "authToken";
    pub const LAST_LOGIN: &str = "lastLogin";
    pub const REGISTRATION_DATE: &str = "registrationDate";
}

/// Application information utilities
pub mod app_info {
    /// Application name used for config and data folders
    pub const APP_NAME: &str = "snapshoot";

    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
