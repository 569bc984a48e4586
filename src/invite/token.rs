//! Invite token and join outcome types.

use std::fmt;

use crate::client::JoinReceipt;

/// Number of leading characters shown when a token is logged.
const VISIBLE_PREFIX: usize = 6;

/// Opaque invite token minted by the backend.
///
/// Never empty. No structure is assumed; validity is decided by the
/// backend when the token is redeemed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct InviteToken(String);

impl InviteToken {
    /// Wraps a raw token, rejecting blank input.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == raw.len() {
            Some(Self(raw))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Returns the raw token for the redeem request.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a log-safe rendering showing only a short prefix.
    #[must_use]
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(VISIBLE_PREFIX).collect();
        format!("{prefix}…")
    }
}

impl fmt::Debug for InviteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InviteToken").field(&self.redacted()).finish()
    }
}

/// Result of redeeming an invite token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The user is now a member of the group.
    Joined(JoinReceipt),
    /// The backend rejected the token for good.
    InvalidOrExpired {
        /// Server-provided reason, if any.
        detail: Option<String>,
    },
    /// The call did not complete; the token may be retried.
    NetworkFailure {
        /// Description of the failure, for logging.
        reason: String,
    },
    /// The backend rejected the credential while redeeming.
    SessionExpired,
}

impl JoinOutcome {
    /// Returns whether the stored token should be discarded.
    ///
    /// Transient failures and credential rejections keep the token.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Joined(_) | Self::InvalidOrExpired { .. })
    }
}
