//! Secure storage abstraction for the bearer credential.
//!
//! The platform layer provides the actual implementation (iOS Keychain,
//! Android Keystore via the app shell). Rust code never writes the
//! credential to disk on its own.

use std::fmt;

use zeroize::Zeroizing;

use super::error::Result;

/// Storage key for the backend access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key recording what kind of account the access token belongs to.
///
/// The backend user record does not always say whether the account is a
/// guest, so the kind is remembered from how the token was obtained.
pub const SESSION_KIND_KEY: &str = "session_kind";

const GUEST_SESSION: &str = "guest";

/// Bearer credential issued by the backend.
///
/// The inner string is wiped from memory on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    /// Wraps a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    /// Returns the raw token for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"<redacted>").finish()
    }
}

/// Trait for secure storage of the bearer credential.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so the HTTP gateway and the
/// session manager can share one instance.
pub trait CredentialStore: Send + Sync {
    /// Stores a value under the given key, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieves the value for the given key.
    ///
    /// # Errors
    ///
    /// Returns an error if the retrieval operation fails.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Deletes the value for the given key. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Typed helpers for the access token slot.
pub trait CredentialStoreExt: CredentialStore {
    /// Loads the stored access token, treating an empty value as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the retrieval operation fails.
    fn access_token(&self) -> Result<Option<AccessToken>> {
        Ok(self
            .get(ACCESS_TOKEN_KEY)?
            .filter(|raw| !raw.trim().is_empty())
            .map(AccessToken::new))
    }

    /// Persists the access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn set_access_token(&self, token: &AccessToken) -> Result<()> {
        self.delete(SESSION_KIND_KEY)?;
        self.set(ACCESS_TOKEN_KEY, token.expose())
    }

    /// Persists an access token obtained through guest login.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn set_guest_access_token(&self, token: &AccessToken) -> Result<()> {
        self.set(ACCESS_TOKEN_KEY, token.expose())?;
        self.set(SESSION_KIND_KEY, GUEST_SESSION)
    }

    /// Returns whether the stored access token came from guest login.
    ///
    /// # Errors
    ///
    /// Returns an error if the retrieval operation fails.
    fn is_guest_credential(&self) -> Result<bool> {
        Ok(self.get(SESSION_KIND_KEY)?.as_deref() == Some(GUEST_SESSION))
    }

    /// Removes the access token and its session kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn clear_access_token(&self) -> Result<()> {
        self.delete(SESSION_KIND_KEY)?;
        self.delete(ACCESS_TOKEN_KEY)
    }
}

impl<T: CredentialStore + ?Sized> CredentialStoreExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCredentialStore;

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("eyJhbGciOiJIUzI1NiJ9.secret");
        let debug_str = format!("{token:?}");
        assert!(debug_str.contains("redacted"));
        assert!(!debug_str.contains("secret"));
    }

    #[test]
    fn access_token_roundtrip_through_store() {
        let store = MemoryCredentialStore::new();
        assert!(store.access_token().unwrap().is_none());

        store.set_access_token(&AccessToken::new("abc")).unwrap();
        let loaded = store.access_token().unwrap().unwrap();
        assert_eq!(loaded.expose(), "abc");

        store.clear_access_token().unwrap();
        assert!(store.access_token().unwrap().is_none());
    }

    #[test]
    fn blank_stored_token_is_treated_as_absent() {
        let store = MemoryCredentialStore::new();
        store.set(ACCESS_TOKEN_KEY, "   ").unwrap();
        assert!(store.access_token().unwrap().is_none());
    }

    #[test]
    fn guest_credential_is_marked_until_replaced() {
        let store = MemoryCredentialStore::new();
        store
            .set_guest_access_token(&AccessToken::new("guest"))
            .unwrap();
        assert!(store.is_guest_credential().unwrap());

        store.set_access_token(&AccessToken::new("user")).unwrap();
        assert!(!store.is_guest_credential().unwrap());
    }

    #[test]
    fn clearing_credential_drops_guest_marker() {
        let store = MemoryCredentialStore::new();
        store
            .set_guest_access_token(&AccessToken::new("guest"))
            .unwrap();

        store.clear_access_token().unwrap();

        assert!(!store.is_guest_credential().unwrap());
        assert!(store.get(SESSION_KIND_KEY).unwrap().is_none());
    }
}
