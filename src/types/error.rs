//! Error types for Sanctum

use hyper::StatusCode;

/// Main error type for Sanctum operations
#[derive(Debug, thiserror::Error)]
pub enum SanctumError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The groupware or account service answered non-2xx, or the transport
    /// failed outright (no status available).
    #[error("Remote failure: {message}")]
    Remote {
        status: Option<u16>,
        message: String,
    },

    /// The upstream answered 2xx but the body did not match the expected
    /// entity shape.
    #[error("Remote returned malformed data: {0}")]
    WrongShape(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SanctumError {
    /// Build a remote failure without an upstream status (transport error,
    /// timeout).
    pub fn remote_transport(message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: message.into(),
        }
    }

    /// Build a remote failure carrying the upstream status code.
    pub fn remote_status(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Whether this error came from the upstream boundary. Read paths map
    /// these to empty defaults instead of propagating.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::WrongShape(_))
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Remote { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::WrongShape(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.to_string();
        (status, body)
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for SanctumError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for SanctumError {
    fn from(err: serde_json::Error) -> Self {
        Self::WrongShape(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for SanctumError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<reqwest::Error> for SanctumError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::remote_status(status.as_u16(), err.to_string()),
            None => Self::remote_transport(err.to_string()),
        }
    }
}

/// Result type alias for Sanctum operations
pub type Result<T> = std::result::Result<T, SanctumError>;
