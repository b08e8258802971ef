// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera session manager

use crate::auth::ApiError;
use crate::backends::camera::BackendError;
use crate::pipelines::CaptureError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Failure kinds surfaced to consumers of a session
///
/// Snapshots carry one of these while the session is in the `Error` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The user (or platform policy) refused camera/microphone access
    PermissionDenied,
    /// No device for the requested facing, or it is held elsewhere
    DeviceUnavailable,
    /// An async result arrived after the session had moved on
    StaleResultDiscarded,
    /// A recording stopped before any chunk was buffered
    RecordingProducedEmptyClip,
    /// A still capture could not read or encode a frame
    CaptureFailed,
    /// Remote API could not be reached
    NetworkFailure,
    /// Remote API rejected the credentials or token
    Unauthorized,
}

impl ErrorKind {
    /// Whether a plain `startPreview` may retry out of this error
    ///
    /// `DeviceUnavailable` stays until the view is left and re-entered.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorKind::DeviceUnavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::PermissionDenied => "Camera permission denied",
            ErrorKind::DeviceUnavailable => "Camera unavailable",
            ErrorKind::StaleResultDiscarded => "Stale result discarded",
            ErrorKind::RecordingProducedEmptyClip => "Recording produced an empty clip",
            ErrorKind::CaptureFailed => "Capture failed",
            ErrorKind::NetworkFailure => "Network failure",
            ErrorKind::Unauthorized => "Unauthorized",
        };
        write!(f, "{}", text)
    }
}

/// Session handle errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session task has shut down
    Closed,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Closed => write!(f, "Session is closed"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera backend errors
    Camera(BackendError),
    /// Photo/clip capture errors
    Capture(CaptureError),
    /// Session handle errors
    Session(SessionError),
    /// Remote API errors
    Api(ApiError),
    /// A session ended in the error state
    Failed(ErrorKind),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

impl AppError {
    /// Failure kind, when the error maps onto the session taxonomy
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Camera(e) => Some(e.kind()),
            AppError::Capture(e) => Some(e.kind()),
            AppError::Api(e) => e.kind(),
            AppError::Failed(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Session(e) => write!(f, "Session error: {}", e),
            AppError::Api(e) => write!(f, "API error: {}", e),
            AppError::Failed(kind) => write!(f, "Session failed: {}", kind),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Camera(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        AppError::Api(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::PermissionDenied.is_retryable());
        assert!(!ErrorKind::DeviceUnavailable.is_retryable());
    }

    #[test]
    fn test_app_error_kind_mapping() {
        let err = AppError::from(BackendError::PermissionDenied);
        assert_eq!(err.kind(), Some(ErrorKind::PermissionDenied));
        assert_eq!(AppError::from("boom").kind(), None);
    }
}
