// SPDX-License-Identifier: GPL-3.0-only

//! Signed-in user state
//!
//! One explicit object instead of process-wide state: whoever needs the
//! current user gets an `AuthContext` (or an `Arc` of one) passed in.

use super::api::{ApiError, ProfileUpdate, RemoteApi, User};
use super::preferences::SecureStore;
use crate::constants::preference_keys as keys;
use crate::errors::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone)]
struct Signed {
    user: User,
    token: String,
}

pub struct AuthContext {
    api: Arc<dyn RemoteApi>,
    store: Arc<dyn SecureStore>,
    current: RwLock<Option<Signed>>,
}

impl AuthContext {
    pub fn new(api: Arc<dyn RemoteApi>, store: Arc<dyn SecureStore>) -> Self {
        Self {
            api,
            store,
            current: RwLock::new(None),
        }
    }

    /// Load the stored user
    ///
    /// Signed in only when both the user and the token are stored. Unreadable
    /// entries are logged and leave the context signed out.
    pub async fn restore(&self) -> Option<User> {
        let user = self.store.get(keys::CURRENT_USER).await;
        let token = self.store.get(keys::AUTH_TOKEN).await;

        let restored = match (user, token) {
            (Ok(Some(user)), Ok(Some(token))) => match serde_json::from_str::<User>(&user) {
                Ok(user) => Some(Signed { user, token }),
                Err(e) => {
                    warn!(error = %e, "Stored user is unreadable");
                    None
                }
            },
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to load stored user");
                None
            }
            _ => None,
        };

        let user = restored.as_ref().map(|s| s.user.clone());
        if let Some(user) = &user {
            info!(username = %user.username, "Restored signed-in user");
        }
        *self.current.write().await = restored;
        user
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        let grant = self.api.login(email, password).await?;
        self.persist(&grant.user, &grant.token).await?;
        self.store
            .set(keys::LAST_LOGIN, &chrono::Utc::now().to_rfc3339())
            .await?;

        info!(username = %grant.user.username, "User signed in");
        let user = grant.user.clone();
        *self.current.write().await = Some(Signed {
            user: grant.user,
            token: grant.token,
        });
        Ok(user)
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> AppResult<User> {
        let grant = self.api.register(username, email, password).await?;
        self.persist(&grant.user, &grant.token).await?;
        self.store
            .set(keys::REGISTRATION_DATE, &chrono::Utc::now().to_rfc3339())
            .await?;

        info!(username = %grant.user.username, "User registered");
        let user = grant.user.clone();
        *self.current.write().await = Some(Signed {
            user: grant.user,
            token: grant.token,
        });
        Ok(user)
    }

    /// Forget the user and token
    pub async fn logout(&self) -> AppResult<()> {
        self.store.remove(keys::CURRENT_USER).await?;
        self.store.remove(keys::AUTH_TOKEN).await?;
        if let Some(signed) = self.current.write().await.take() {
            info!(username = %signed.user.username, "User signed out");
        }
        Ok(())
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> AppResult<User> {
        let Some(signed) = self.current.read().await.clone() else {
            return Err(AppError::Api(ApiError::NotSignedIn));
        };

        let user = self
            .api
            .update_profile(&signed.token, &signed.user, update)
            .await?;
        self.store
            .set(keys::CURRENT_USER, &serde_json::to_string(&user)?)
            .await?;

        info!(username = %user.username, "Profile updated");
        if let Some(current) = self.current.write().await.as_mut() {
            current.user = user.clone();
        }
        Ok(user)
    }

    pub async fn current_user(&self) -> Option<User> {
        self.current.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// `Bearer <token>` for an Authorization header
    pub async fn bearer_token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|s| format!("Bearer {}", s.token))
    }

    async fn persist(&self, user: &User, token: &str) -> AppResult<()> {
        self.store
            .set(keys::CURRENT_USER, &serde_json::to_string(user)?)
            .await?;
        self.store.set(keys::AUTH_TOKEN, token).await
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext").finish_non_exhaustive()
    }
}
