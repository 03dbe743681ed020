//! HTTP client for the feedback API.

use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{FeedbackItem, LoginResponse, User};
use super::ApiError;
use crate::config::Config;

/// Client for the remote feedback service.
///
/// Stateless beyond the connection pool; authentication is per-request via
/// the `Authorization: Token <token>` header.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Creates a client against the given base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Creates a client from the resolved configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_url())
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchanges username/password for a session token and user record.
    ///
    /// Empty inputs are passed through; the server is authoritative on
    /// validity.
    ///
    /// # Errors
    /// `InvalidCredentials` on HTTP 400/401/403, otherwise the usual
    /// network/server taxonomy.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let url = format!("{}/login/", self.base_url);
        debug!(%url, username, "sending login request");

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if matches!(status.as_u16(), 400 | 401 | 403) {
            return Err(ApiError::InvalidCredentials);
        }
        decode(response).await
    }

    /// Fetches the user record the given token authenticates.
    ///
    /// # Errors
    /// `InvalidToken` on HTTP 401/403, otherwise the usual taxonomy.
    pub async fn current_user(&self, token: &str) -> Result<User, ApiError> {
        let url = format!("{}/user/", self.base_url);
        debug!(%url, "validating session token");

        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Token {token}"))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if matches!(status.as_u16(), 401 | 403) {
            return Err(ApiError::InvalidToken);
        }
        decode(response).await
    }

    /// Fetches the feedback list. Response order is preserved and
    /// significant (render order = response order).
    ///
    /// Sent unauthenticated; the server's authorization policy decides
    /// whether the listing is public.
    ///
    /// # Errors
    /// Network/server taxonomy; no auth variant since no token is sent.
    pub async fn feedbacks(&self) -> Result<Vec<FeedbackItem>, ApiError> {
        let url = format!("{}/feedbacks/", self.base_url);
        debug!(%url, "fetching feedback list");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        decode(response).await
    }
}

/// Decodes a 2xx response body, classifying everything else.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ApiError::Server {
            status: status.as_u16(),
            message,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    serde_json::from_str(&body).map_err(|e| ApiError::Malformed(e.to_string()))
}
