//! Lunch Buddy Core Library
//!
//! Core functionality for Lunch Buddy - group lunch coordination.
//! This crate provides the session handling and the deferred invite-join
//! workflow behind the mobile app: an invite link opened by a signed-out
//! user or a guest is parked durably and redeemed once the user has a
//! registered account.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

mod api;
pub mod client;
pub mod config;
mod error;
pub mod invite;
pub mod join;
pub mod session;
pub mod storage;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use api::LunchBuddyCore;
pub use config::ClientConfig;
pub use error::{CoreError, CoreResult};
pub use invite::{InviteToken, JoinOutcome};
pub use join::{Effect, LinkEvent, Notice, NoticeKind, Route};
pub use session::{Identity, Session};
