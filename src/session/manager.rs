//! Session lifecycle: start-up auth check, login, logout.
//!
//! The [`SessionManager`] owns the one [`Session`] of the process and
//! publishes every change on a `watch` channel. The join workflow and the
//! route guard subscribe to it instead of polling.
//!
//! ```text
//! Loading ──initialize──▶ Unauthenticated | Guest | Registered
//! Unauthenticated|Guest ──login──▶ Registered (or Unauthenticated on failure)
//! any ──logout──▶ Unauthenticated
//! ```

use std::sync::Arc;

use tokio::sync::watch;

use super::error::{Result, SessionError};
use super::types::{Identity, Session};
use crate::client::{ApiError, LunchBuddyApi, NewUser, User};
use crate::invite::PendingInviteStore;
use crate::storage::{AccessToken, CredentialStore, CredentialStoreExt};

/// Owner of the process-wide session.
pub struct SessionManager {
    api: Arc<dyn LunchBuddyApi>,
    credentials: Arc<dyn CredentialStore>,
    pending: Arc<dyn PendingInviteStore>,
    state: watch::Sender<Session>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager in the loading state.
    #[must_use]
    pub fn new(
        api: Arc<dyn LunchBuddyApi>,
        credentials: Arc<dyn CredentialStore>,
        pending: Arc<dyn PendingInviteStore>,
    ) -> Self {
        let (state, _) = watch::channel(Session::starting());
        Self {
            api,
            credentials,
            pending,
            state,
        }
    }

    /// Returns the current session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Subscribes to session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    fn publish(&self, identity: Identity) {
        log::info!("Session resolved as {}", identity.label());
        self.state.send_replace(Session::resolved(identity));
    }

    /// Resolves the identity at process start.
    ///
    /// A stored credential is validated with `GET /auth/me`. Without one,
    /// or when the backend rejects it, a guest account is provisioned.
    /// A credential that cannot be checked because the backend is
    /// unreachable is kept and the session resolves as unauthenticated.
    ///
    /// Always leaves the session out of the loading state.
    pub async fn initialize(&self) -> Identity {
        let identity = self.resolve_start_identity().await;
        self.publish(identity.clone());
        identity
    }

    async fn resolve_start_identity(&self) -> Identity {
        let stored = match self.credentials.access_token() {
            Ok(token) => token,
            Err(e) => {
                log::error!("Failed to read stored credential: {e}");
                None
            }
        };

        if stored.is_some() {
            match self.api.current_user().await {
                Ok(user) => return self.stored_identity(user),
                Err(ApiError::Unauthorized) => {
                    log::info!("Stored credential rejected, falling back to guest login");
                    if let Err(e) = self.credentials.clear_access_token() {
                        log::warn!("Failed to clear rejected credential: {e}");
                    }
                }
                Err(e) => {
                    log::warn!("Could not validate stored credential: {e}");
                    return Identity::Unauthenticated;
                }
            }
        } else {
            log::info!("No credential found, attempting guest login");
        }

        match self.provision_guest().await {
            Ok(user) => Identity::Guest(user),
            Err(e) => {
                log::warn!("Guest login failed: {e}");
                Identity::Unauthenticated
            }
        }
    }

    /// Classifies the user behind a stored credential. A token that was
    /// obtained through guest login stays a guest across restarts.
    fn stored_identity(&self, user: User) -> Identity {
        match self.credentials.is_guest_credential() {
            Ok(true) => Identity::Guest(user),
            Ok(false) => Identity::from_user(user),
            Err(e) => {
                log::warn!("Failed to read session kind: {e}");
                Identity::from_user(user)
            }
        }
    }

    async fn provision_guest(&self) -> Result<User> {
        let token = self.api.login_guest().await?.into_access_token();
        self.credentials.set_guest_access_token(&token)?;
        match self.api.current_user().await {
            Ok(user) => Ok(user),
            Err(e) => {
                if let Err(clear_err) = self.credentials.clear_access_token() {
                    log::warn!("Failed to clear guest credential: {clear_err}");
                }
                Err(e.into())
            }
        }
    }

    /// Provisions a guest account and makes it the current identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails. The session is then
    /// unauthenticated.
    pub async fn login_guest(&self) -> Result<User> {
        match self.provision_guest().await {
            Ok(user) => {
                self.publish(Identity::Guest(user.clone()));
                Ok(user)
            }
            Err(e) => {
                self.publish(Identity::Unauthenticated);
                Err(e)
            }
        }
    }

    /// Establishes the identity behind `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be stored or validated.
    /// The credential is then discarded and the session unauthenticated.
    pub async fn login(&self, token: AccessToken) -> Result<User> {
        let result = self.validate_credential(&token).await;
        match result {
            Ok(user) => {
                self.publish(Identity::from_user(user.clone()));
                Ok(user)
            }
            Err(e) => {
                log::warn!("Login failed: {e}");
                if let Err(clear_err) = self.credentials.clear_access_token() {
                    log::warn!("Failed to clear credential after failed login: {clear_err}");
                }
                self.publish(Identity::Unauthenticated);
                Err(e)
            }
        }
    }

    async fn validate_credential(&self, token: &AccessToken) -> Result<User> {
        self.credentials.set_access_token(token)?;
        Ok(self.api.current_user().await?)
    }

    /// Signs in with email and password.
    ///
    /// A rejected password leaves the current identity untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidInput`] for blank fields, or the
    /// backend / storage error.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(SessionError::InvalidInput(
                "Please enter both email and password".to_string(),
            ));
        }
        let token = self
            .api
            .login_with_password(email.trim(), password)
            .await?
            .into_access_token();
        self.login(token).await
    }

    /// Registers a new account and signs in with it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidInput`] for blank required fields, or
    /// the backend / storage error.
    pub async fn sign_up(&self, new_user: &NewUser) -> Result<User> {
        if new_user.email.trim().is_empty() || new_user.password.is_empty() {
            return Err(SessionError::InvalidInput(
                "Email and password are required".to_string(),
            ));
        }
        let created = self.api.sign_up(new_user).await?;
        log::info!("Registered account {}", created.id);
        self.sign_in(&new_user.email, &new_user.password).await
    }

    /// Signs out: drops the credential and any deferred invite.
    ///
    /// The session is unauthenticated afterwards even if a storage
    /// operation fails.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub fn logout(&self) -> Result<()> {
        let credential = self.credentials.clear_access_token();
        let pending = self.pending.clear();
        self.publish(Identity::Unauthenticated);
        credential?;
        pending?;
        Ok(())
    }

    /// Marks the session unauthenticated after the backend rejected the
    /// credential mid-session. Any deferred invite is kept.
    pub fn expire(&self) {
        if let Err(e) = self.credentials.clear_access_token() {
            log::warn!("Failed to clear expired credential: {e}");
        }
        let already = {
            let current = self.state.borrow();
            !current.loading && current.identity == Identity::Unauthenticated
        };
        if !already {
            self.publish(Identity::Unauthenticated);
        }
    }
}
