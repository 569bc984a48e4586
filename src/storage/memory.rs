//! In-memory stores for tests.
//!
//! These implementations are NOT secure or durable and must only be used
//! in tests.

use std::collections::HashMap;
use std::sync::RwLock;

use super::credential::CredentialStore;
use super::error::{Result, StorageError};

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `value` under `key`.
    #[must_use]
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::default();
        if let Ok(mut data) = store.data.write() {
            data.insert(key.to_string(), value.to_string());
        }
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        data.remove(key);
        Ok(())
    }
}
