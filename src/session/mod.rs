//! Authentication session.
//!
//! Exactly one [`Session`] exists per [`SessionManager`]. It starts in the
//! loading state and resolves once the start-up auth check finishes. A
//! device without a stored credential is given a guest account
//! automatically; guests can browse but must register before joining a
//! group.

mod error;
mod manager;
mod types;

pub use error::{Result, SessionError};
pub use manager::SessionManager;
pub use types::{Identity, Session};
