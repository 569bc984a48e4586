//! Error types for local storage operations.

use thiserror::Error;

/// Error type for secure and durable storage.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Platform secure storage rejected the operation.
    #[error("Secure storage error: {0}")]
    Secure(String),

    /// Database error from `SQLite`.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem error around the database file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Lock poisoned or unavailable.
    #[error("Storage lock error: {0}")]
    Lock(String),

    /// Stored value could not be interpreted.
    #[error("Corrupt stored value for {key}: {reason}")]
    Corrupt {
        /// Storage key holding the bad value.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
