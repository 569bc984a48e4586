//! Backend API client.
//!
//! # Architecture
//!
//! ```text
//! LunchBuddyApi (trait consumed by session + join workflow)
//!     └── HttpApi
//!             └── HttpGateway (reqwest, bearer attachment, 401 handling)
//!                     └── CredentialStore
//! ```
//!
//! The backend is an opaque service. Invite tokens are never inspected
//! locally; only the outcome of redeeming them matters.

mod endpoints;
mod error;
mod gateway;
pub mod types;

pub use endpoints::{HttpApi, LunchBuddyApi};
pub use error::{ApiError, ApiResult};
pub use gateway::{is_auth_failure, HttpGateway, OnUnauthorized};
pub use types::{Group, InviteShare, JoinReceipt, NewGroup, NewUser, TokenResponse, User};
