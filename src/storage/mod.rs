//! Local storage for the client.
//!
//! Two kinds of state outlive the process:
//!
//! - the bearer credential, kept in platform secure storage behind
//!   [`CredentialStore`]
//! - small app values (the deferred invite token), kept in a local
//!   `SQLite` database via [`SqliteStore`]
//!
//! Nothing else is persisted by the core.

mod credential;
mod error;
#[cfg(any(test, feature = "test-utils"))]
mod memory;
mod sqlite;

pub use credential::{
    AccessToken, CredentialStore, CredentialStoreExt, ACCESS_TOKEN_KEY, SESSION_KIND_KEY,
};
pub use error::{Result, StorageError};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryCredentialStore;
pub use sqlite::{SqliteStore, DATABASE_FILE};
