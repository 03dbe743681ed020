//! Remote data gateway for the feedback API.
//!
//! Stateless request functions normalizing success/failure into typed
//! results. Failures are returned as [`ApiError`] values, never raised as
//! uncaught faults; callers decide how to surface them.

mod client;
mod types;

pub use client::ApiClient;
pub use types::{FeedbackItem, FeedbackStatus, LoginResponse, User};

/// Error taxonomy for remote operations.
///
/// `Malformed` is server-class: the response arrived but could not be
/// decoded against the expected schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Request never reached the server or no response was received.
    Network(String),
    /// Login rejected the supplied username/password.
    InvalidCredentials,
    /// The session token was rejected (expired or revoked).
    InvalidToken,
    /// Non-2xx response outside the auth cases above.
    Server { status: u16, message: String },
    /// Undecodable response payload.
    Malformed(String),
}

impl ApiError {
    /// Returns true for the auth-rejection variants.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::InvalidCredentials | ApiError::InvalidToken)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "network error: {msg}"),
            ApiError::InvalidCredentials => write!(f, "invalid credentials"),
            ApiError::InvalidToken => write!(f, "invalid or expired session token"),
            ApiError::Server { status, message } => {
                write!(f, "server error (HTTP {status}): {message}")
            }
            ApiError::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}
