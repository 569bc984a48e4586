//! Errors raised while assembling the core.

use thiserror::Error;

use crate::client::ApiError;
use crate::storage::StorageError;

/// Error type for [`LunchBuddyCore`](crate::LunchBuddyCore) construction.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The local invite database could not be opened.
    #[error("Local storage unavailable: {0}")]
    Storage(#[from] StorageError),

    /// The backend client could not be built.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type alias for core construction.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_is_not_labelled_as_credentials() {
        let err: CoreError =
            StorageError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")).into();
        assert_eq!(err.to_string(), "Local storage unavailable: I/O error: gone");
    }

    #[test]
    fn api_error_is_transparent() {
        let err: CoreError = ApiError::Initialization("tls".to_string()).into();
        assert_eq!(err.to_string(), ApiError::Initialization("tls".to_string()).to_string());
    }
}
