// SPDX-License-Identifier: GPL-3.0-only

//! Remote API contract
//!
//! Request and response types, the error mapping for non-2xx responses,
//! and a local stand-in that answers without a server. The HTTP client
//! lives in [`super::http`].

use crate::errors::ErrorKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Request paths, relative to the API base URL
pub mod endpoints {
    pub const LOGIN: &str = "/auth/login";
    pub const REGISTER: &str = "/auth/register";
    pub const PROFILE: &str = "/users/me";
}

/// Result type for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

/// Fields to change on a profile; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// `Some(None)` clears the picture
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<Option<String>>,
}

impl ProfileUpdate {
    /// Apply to a user; empty strings keep the current value
    pub fn apply_to(&self, user: &User) -> User {
        let pick = |new: &Option<String>, old: &String| match new {
            Some(value) if !value.is_empty() => value.clone(),
            _ => old.clone(),
        };
        User {
            id: user.id.clone(),
            username: pick(&self.username, &user.username),
            email: pick(&self.email, &user.email),
            profile_picture: match &self.profile_picture {
                Some(picture) => picture.clone(),
                None => user.profile_picture.clone(),
            },
        }
    }
}

/// Successful login or registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthGrant {
    pub user: User,
    /// Bearer token for later requests
    pub token: String,
}

/// API call errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The server could not be reached
    NetworkFailure(String),
    /// Credentials or token rejected (401/403)
    Unauthorized(Option<String>),
    /// Any other non-2xx response
    Status { code: u16, message: Option<String> },
    /// A 2xx response whose body could not be understood
    InvalidResponse(String),
    /// The call needs a signed-in user
    NotSignedIn,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Map a non-2xx response; the body may be JSON with a `message` field
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty());
        debug!(status, message = ?message, "API request failed");

        match status {
            401 | 403 => ApiError::Unauthorized(message),
            code => ApiError::Status { code, message },
        }
    }

    /// Failure kind, when there is one in the session taxonomy
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ApiError::NetworkFailure(_) => Some(ErrorKind::NetworkFailure),
            ApiError::Unauthorized(_) | ApiError::NotSignedIn => Some(ErrorKind::Unauthorized),
            ApiError::Status { .. } | ApiError::InvalidResponse(_) => None,
        }
    }

    /// Server-provided message, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized(message) | ApiError::Status { message, .. } => {
                message.as_deref()
            }
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NetworkFailure(msg) => write!(f, "Network failure: {}", msg),
            ApiError::Unauthorized(Some(msg)) => write!(f, "Unauthorized: {}", msg),
            ApiError::Unauthorized(None) => write!(f, "Unauthorized"),
            ApiError::Status {
                code,
                message: Some(msg),
            } => write!(f, "Request failed ({}): {}", code, msg),
            ApiError::Status { code, message: None } => write!(f, "Request failed ({})", code),
            ApiError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            ApiError::NotSignedIn => write!(f, "No user signed in"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidResponse(err.to_string())
    }
}

/// Remote account API
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, email: &str, password: &str) -> ApiResult<AuthGrant>;

    /// `POST /auth/register`
    async fn register(&self, username: &str, email: &str, password: &str)
    -> ApiResult<AuthGrant>;

    /// `PUT /users/me` with the bearer token
    async fn update_profile(&self, token: &str, current: &User, update: &ProfileUpdate)
    -> ApiResult<User>;
}

/// Offline stand-in for the remote API
///
/// Accepts any non-empty credentials, derives the username from the email
/// and issues `auth-token-<millis>` tokens.
#[derive(Debug, Default)]
pub struct LocalApi;

impl LocalApi {
    fn token() -> String {
        format!("auth-token-{}", chrono::Utc::now().timestamp_millis())
    }

    fn check_credentials(email: &str, password: &str) -> ApiResult<()> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::Status {
                code: 400,
                message: Some("Email and password are required".to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteApi for LocalApi {
    async fn login(&self, email: &str, password: &str) -> ApiResult<AuthGrant> {
        Self::check_credentials(email, password)?;
        let username = email.split('@').next().unwrap_or(email).to_string();
        Ok(AuthGrant {
            user: User {
                id: None,
                email: email.to_string(),
                username,
                profile_picture: None,
            },
            token: Self::token(),
        })
    }

    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ApiResult<AuthGrant> {
        Self::check_credentials(email, password)?;
        Ok(AuthGrant {
            user: User {
                id: Some(format!("user-{}", uuid::Uuid::new_v4())),
                email: email.to_string(),
                username: username.to_string(),
                profile_picture: None,
            },
            token: Self::token(),
        })
    }

    async fn update_profile(
        &self,
        token: &str,
        current: &User,
        update: &ProfileUpdate,
    ) -> ApiResult<User> {
        if token.is_empty() {
            return Err(ApiError::Unauthorized(None));
        }
        Ok(update.apply_to(current))
    }
}
