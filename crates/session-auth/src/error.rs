//! API client error types.

use backoffice_config::ConfigError;
use reqwest::StatusCode;
use thiserror::Error;

/// Error type for every call made through the API client.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The access credential was rejected and the refresh that followed failed.
    /// The local session has been cleared.
    #[error("Session expired. Please login again.")]
    SessionExpired,

    /// The backend answered 401 and no further recovery is allowed
    /// (already retried, or an authentication endpoint).
    #[error("Not authenticated: {body}")]
    Unauthorized { body: String },

    /// Any other non-2xx response, passed through untouched.
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Login rejected by the backend.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Registration rejected by the backend.
    #[error("Registration failed: {0}")]
    Registration(String),

    /// The request could not be built (unknown method, missing fields).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid transition in the per-request state machine.
    #[error("Invalid request state transition: {0}")]
    InvalidStateTransition(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Network unavailable (no response at all)
    #[error("Network unavailable")]
    NetworkUnavailable,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ApiError {
    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors include:
    /// - Network unavailable and timeouts
    /// - Connection errors
    /// - 5xx responses
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::NetworkUnavailable | ApiError::Timeout => true,
            ApiError::Status { status, .. } => status.is_server_error(),
            ApiError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                e.status().is_some_and(|status| status.is_server_error())
            }
            _ => false,
        }
    }

    /// Returns true for the distinguished "session expired" failure.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;
