// SPDX-License-Identifier: GPL-3.0-only

//! Account collaborators of the camera screen
//!
//! - [`preferences`]: key/value stores for the signed-in user and token
//! - [`api`]: remote account API contract
//! - [`http`]: the contract over HTTP
//! - [`context`]: the signed-in user, tying the two together

pub mod api;
pub mod context;
pub mod http;
pub mod preferences;

pub use api::{ApiError, ApiResult, AuthGrant, LocalApi, ProfileUpdate, RemoteApi, User};
pub use context::AuthContext;
pub use http::HttpApi;
pub use preferences::{FileStore, MemoryStore, SecureStore};
