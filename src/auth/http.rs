// SPDX-License-Identifier: GPL-3.0-only

//! HTTP client for the remote account API
//!
//! JSON in and out. Non-2xx responses are mapped through
//! [`ApiError::from_response`]; transport failures (refused connection,
//! timeout) become [`ApiError::NetworkFailure`].

use super::api::{ApiError, ApiResult, AuthGrant, ProfileUpdate, RemoteApi, User, endpoints};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct Credentials<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    email: &'a str,
    password: &'a str,
}

/// [`RemoteApi`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    /// Client for the API served at `base_url` (for example `http://localhost:3000`)
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ApiResult<T> {
        let response = request
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ApiError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::NetworkFailure(e.to_string()))?;
        debug!(status = status.as_u16(), size = body.len(), "API response");

        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RemoteApi for HttpApi {
    async fn login(&self, email: &str, password: &str) -> ApiResult<AuthGrant> {
        let body = Credentials {
            username: None,
            email,
            password,
        };
        self.send(self.client.post(self.url(endpoints::LOGIN)).json(&body))
            .await
    }

    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ApiResult<AuthGrant> {
        let body = Credentials {
            username: Some(username),
            email,
            password,
        };
        self.send(self.client.post(self.url(endpoints::REGISTER)).json(&body))
            .await
    }

    async fn update_profile(
        &self,
        token: &str,
        _current: &User,
        update: &ProfileUpdate,
    ) -> ApiResult<User> {
        self.send(
            self.client
                .put(self.url(endpoints::PROFILE))
                .bearer_auth(token)
                .json(update),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let api = HttpApi::new("http://localhost:3000/");
        assert_eq!(api.base_url(), "http://localhost:3000");
        assert_eq!(api.url(endpoints::LOGIN), "http://localhost:3000/auth/login");
    }

    #[test]
    fn test_login_body_omits_username() {
        let body = Credentials {
            username: None,
            email: "a@b.c",
            password: "pw",
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"email":"a@b.c","password":"pw"}"#
        );
    }
}
