//! Error types for worker API operations.

use thiserror::Error;

/// Result type alias for worker API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors that can occur while talking to the worker API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (DNS, connect, TLS, body read).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, or the status reason.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// The service accepted the request but returned no identifiers.
    #[error("empty response: no {0} returned")]
    EmptyResponse(&'static str),

    /// Local file access failed (e.g. reading a code archive).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Creates a `Status` error.
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Creates a `Decoding` error.
    #[must_use]
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding(message.into())
    }

    /// Returns the HTTP status when the service rejected the request.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for failures worth retrying inside a polling loop.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
