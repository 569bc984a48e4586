//! The deferred invite-join workflow.
//!
//! - [`DeepLinkListener`]: normalizes OS link events
//! - [`JoinOrchestrator`]: decides, defers, flushes and redeems invites
//! - [`RouteGuard`]: auth redirects that yield to link processing
//! - [`Effect`]: navigation and notices for the app shell

mod effects;
mod guard;
mod listener;
mod orchestrator;

pub use effects::{Effect, EffectSink, Notice, NoticeKind, Route};
#[cfg(any(test, feature = "test-utils"))]
pub use effects::RecordingSink;
pub use guard::{route_redirect, LinkPhase, RouteGuard, RouteSection};
pub use listener::{DeepLinkListener, LinkEvent};
pub use orchestrator::{JoinOrchestrator, LinkDisposition};
