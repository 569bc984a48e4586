//! Error types for backend API calls.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur while talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected the credential (401/403).
    #[error("Credential rejected by server")]
    Unauthorized,

    /// The backend answered with a non-success status.
    #[error("Request rejected with status {status}: {detail}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Human-readable detail extracted from the response body.
        detail: String,
    },

    /// The request never produced a response (connect, DNS, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Reading or clearing the stored credential failed.
    #[error("Credential storage error: {0}")]
    Storage(#[from] StorageError),

    /// The HTTP client could not be built.
    #[error("HTTP client initialization failed: {0}")]
    Initialization(String),
}

impl ApiError {
    /// Returns true for failures worth retrying later.
    ///
    /// Transport errors, server-side (5xx) rejections and undecodable
    /// bodies are transient. Client-side rejections are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Decode(_) | Self::Storage(_) => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Unauthorized | Self::Initialization(_) => false,
        }
    }

    /// Returns the server-provided detail for rejections.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Rejected { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::Initialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
