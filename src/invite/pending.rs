//! Durable single-slot storage for a deferred invite token.
//!
//! At most one token is stored. A newer link overwrites the previous
//! one (last link wins).

use super::token::InviteToken;
use crate::storage::{Result, SqliteStore, StorageError};

/// Storage key of the deferred invite token.
pub const PENDING_INVITE_KEY: &str = "pending_invite_token";

/// Single-slot store for the deferred invite token.
///
/// Implementations must survive process restarts, except the in-memory
/// one used in tests.
pub trait PendingInviteStore: Send + Sync {
    /// Stores `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn set(&self, token: &InviteToken) -> Result<()>;

    /// Returns the stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the retrieval operation fails.
    fn get(&self) -> Result<Option<InviteToken>>;

    /// Removes the stored token. Clearing an empty slot succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn clear(&self) -> Result<()>;
}

impl PendingInviteStore for SqliteStore {
    fn set(&self, token: &InviteToken) -> Result<()> {
        self.put(PENDING_INVITE_KEY, token.as_str())
    }

    fn get(&self) -> Result<Option<InviteToken>> {
        match self.fetch(PENDING_INVITE_KEY)? {
            None => Ok(None),
            Some(raw) => InviteToken::new(raw).map(Some).ok_or_else(|| StorageError::Corrupt {
                key: PENDING_INVITE_KEY.to_string(),
                reason: "blank token".to_string(),
            }),
        }
    }

    fn clear(&self) -> Result<()> {
        self.remove(PENDING_INVITE_KEY)
    }
}

/// In-memory pending-invite slot for tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MemoryPendingInviteStore {
    slot: std::sync::RwLock<Option<InviteToken>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MemoryPendingInviteStore {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot already holding `token`.
    #[must_use]
    pub fn holding(token: &str) -> Self {
        Self {
            slot: std::sync::RwLock::new(InviteToken::new(token)),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl PendingInviteStore for MemoryPendingInviteStore {
    fn set(&self, token: &InviteToken) -> Result<()> {
        let mut slot = self
            .slot
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        *slot = Some(token.clone());
        Ok(())
    }

    fn get(&self) -> Result<Option<InviteToken>> {
        let slot = self
            .slot
            .read()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(slot.clone())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .slot
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        *slot = None;
        Ok(())
    }
}
