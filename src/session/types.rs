//! Session state types.

use crate::client::User;

/// Who the app is acting as.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    /// No credential, or the credential was rejected.
    #[default]
    Unauthenticated,
    /// Provisional backend-issued account. Cannot join groups.
    Guest(User),
    /// Registered account.
    Registered(User),
}

impl Identity {
    /// Classifies a user record from `GET /auth/me`.
    #[must_use]
    pub fn from_user(user: User) -> Self {
        if user.is_guest {
            Self::Guest(user)
        } else {
            Self::Registered(user)
        }
    }

    /// Returns the user record, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Unauthenticated => None,
            Self::Guest(user) | Self::Registered(user) => Some(user),
        }
    }

    /// Returns whether this is a registered account.
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        matches!(self, Self::Registered(_))
    }

    /// Returns whether this is a guest account.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Guest(_) => "guest",
            Self::Registered(_) => "registered",
        }
    }
}

/// Process-wide session snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Current identity. Meaningless while `loading` is true.
    pub identity: Identity,
    /// True until the start-up auth check has resolved.
    pub loading: bool,
}

impl Session {
    /// Session at process start, before the auth check.
    #[must_use]
    pub const fn starting() -> Self {
        Self {
            identity: Identity::Unauthenticated,
            loading: true,
        }
    }

    /// Resolved session with the given identity.
    #[must_use]
    pub const fn resolved(identity: Identity) -> Self {
        Self {
            identity,
            loading: false,
        }
    }

    /// Returns whether a join may be issued right now.
    #[must_use]
    pub const fn can_join(&self) -> bool {
        !self.loading && self.identity.is_registered()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::starting()
    }
}
