//! Redeeming invite tokens against the backend.

use std::sync::Arc;

use super::token::{InviteToken, JoinOutcome};
use crate::client::{ApiError, LunchBuddyApi};

/// Performs the join call and classifies its result.
#[derive(Clone)]
pub struct InviteJoinClient {
    api: Arc<dyn LunchBuddyApi>,
}

impl std::fmt::Debug for InviteJoinClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InviteJoinClient").finish_non_exhaustive()
    }
}

impl InviteJoinClient {
    /// Wraps the backend API.
    #[must_use]
    pub fn new(api: Arc<dyn LunchBuddyApi>) -> Self {
        Self { api }
    }

    /// Redeems `token` for the current user.
    ///
    /// Never fails: every error is folded into a [`JoinOutcome`].
    pub async fn redeem(&self, token: &InviteToken) -> JoinOutcome {
        log::debug!("Redeeming invite {}", token.redacted());
        let outcome = classify(self.api.join_by_token(token.as_str()).await);
        match &outcome {
            JoinOutcome::Joined(receipt) => log::info!("Joined group: {}", receipt.message),
            JoinOutcome::InvalidOrExpired { detail } => {
                log::info!("Invite {} rejected: {detail:?}", token.redacted());
            }
            JoinOutcome::NetworkFailure { reason } => {
                log::warn!("Invite {} not redeemed: {reason}", token.redacted());
            }
            JoinOutcome::SessionExpired => log::warn!("Credential rejected while joining"),
        }
        outcome
    }
}

fn classify(result: Result<crate::client::JoinReceipt, ApiError>) -> JoinOutcome {
    match result {
        Ok(receipt) => JoinOutcome::Joined(receipt),
        Err(ApiError::Unauthorized) => JoinOutcome::SessionExpired,
        Err(err @ ApiError::Rejected { .. }) if !err.is_transient() => {
            JoinOutcome::InvalidOrExpired {
                detail: err.detail().map(ToString::to_string),
            }
        }
        Err(err) => JoinOutcome::NetworkFailure {
            reason: err.to_string(),
        },
    }
}
