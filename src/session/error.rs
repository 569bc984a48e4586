//! Error types for session operations.

use thiserror::Error;

use crate::client::ApiError;
use crate::storage::StorageError;

/// Error type for session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Reading or writing local state failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The caller supplied unusable input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SessionError {
    /// Message suitable for a sign-in form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(ApiError::Rejected { detail, .. }) => detail.clone(),
            Self::Api(ApiError::Unauthorized) => "Your session has expired.".to_string(),
            Self::Api(ApiError::Network(_)) => "Could not reach the server.".to_string(),
            Self::InvalidInput(msg) => msg.clone(),
            Self::Api(_) | Self::Storage(_) => "Sign in failed.".to_string(),
        }
    }
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
