//! Authentication route guard.
//!
//! Decides whether the shell should leave the screen it is on because of
//! the session state. While an invite link is being processed the guard
//! stays quiet so it cannot race the join workflow's own navigation.

use tokio::sync::watch;

use super::effects::Route;
use crate::session::{Identity, Session};

/// Whether invite processing is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkPhase {
    /// No link or deferred invite is being handled.
    #[default]
    Idle,
    /// A link or deferred invite is being handled.
    ProcessingLink,
}

/// Top-level section of the app the user is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSection {
    /// Sign-in / sign-up screens.
    Auth,
    /// Everything else.
    App,
}

/// Returns where the shell must redirect to, if anywhere.
#[must_use]
pub const fn route_redirect(
    session: &Session,
    phase: LinkPhase,
    section: RouteSection,
) -> Option<Route> {
    if session.loading || matches!(phase, LinkPhase::ProcessingLink) {
        return None;
    }
    match (&session.identity, section) {
        (Identity::Unauthenticated, RouteSection::App) => Some(Route::SignIn),
        (Identity::Registered(_), RouteSection::Auth) => Some(Route::GroupList),
        // Guests may stay on the auth screens to register.
        _ => None,
    }
}

/// Live route guard bound to the session and link phase channels.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: watch::Receiver<Session>,
    phase: watch::Receiver<LinkPhase>,
}

impl RouteGuard {
    /// Creates a guard from the two state channels.
    #[must_use]
    pub const fn new(session: watch::Receiver<Session>, phase: watch::Receiver<LinkPhase>) -> Self {
        Self { session, phase }
    }

    /// Evaluates the guard for the current section.
    #[must_use]
    pub fn redirect_for(&self, section: RouteSection) -> Option<Route> {
        let phase = *self.phase.borrow();
        let session = self.session.borrow();
        route_redirect(&session, phase, section)
    }
}
