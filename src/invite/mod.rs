//! Group invitations.
//!
//! - [`InviteLinkParser`]: extracts an [`InviteToken`] from a deep link
//! - [`PendingInviteStore`]: durable single slot for a deferred token
//! - [`InviteJoinClient`]: redeems a token and classifies the result as a
//!   [`JoinOutcome`]
//!
//! Tokens are opaque. Whether a token is valid is only known after the
//! backend has tried to redeem it.

mod link;
mod pending;
mod redeem;
mod token;

pub use link::InviteLinkParser;
#[cfg(any(test, feature = "test-utils"))]
pub use pending::MemoryPendingInviteStore;
pub use pending::{PendingInviteStore, PENDING_INVITE_KEY};
pub use redeem::InviteJoinClient;
pub use token::{InviteToken, JoinOutcome};
