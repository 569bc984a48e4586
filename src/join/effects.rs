//! Side effects emitted by the core for the app shell.
//!
//! The core never renders anything. Navigation intents and user notices
//! are pushed through an [`EffectSink`] in the order they happen; the
//! shell drains them and updates the UI.

use tokio::sync::mpsc::UnboundedSender;

/// Screens the core can ask the shell to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Email/password sign-in screen.
    SignIn,
    /// Registration screen.
    SignUp,
    /// The user's group list (home tab).
    GroupList,
}

impl Route {
    /// Router path understood by the shell.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::SignIn => "/sign-in",
            Self::SignUp => "/sign-up",
            Self::GroupList => "/",
        }
    }

    /// Returns whether the route belongs to the authentication section.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::SignIn | Self::SignUp)
    }
}

/// Category of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    /// An invite was deferred until the user signs in.
    LoginRequired,
    /// An invite was deferred until the guest registers.
    RegisterToJoin,
    /// The user joined a group.
    Joined,
    /// The invite was rejected for good.
    JoinFailed,
    /// The invite could not be redeemed right now and is kept for later.
    JoinRetryable,
    /// The credential expired while redeeming an invite.
    SessionExpired,
    /// A scanned code is not a Lunch Buddy invite.
    InvalidCode,
}

/// Notice to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Category, for styling and tests.
    pub kind: NoticeKind,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
}

impl Notice {
    fn new(kind: NoticeKind, title: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn login_required() -> Self {
        Self::new(
            NoticeKind::LoginRequired,
            "Sign in required",
            "Please log in to join the group.",
        )
    }

    pub(crate) fn register_to_join() -> Self {
        Self::new(
            NoticeKind::RegisterToJoin,
            "Create an account",
            "Guest accounts can't join groups. Register to join.",
        )
    }

    pub(crate) fn joined() -> Self {
        Self::new(NoticeKind::Joined, "Success", "You have joined the group!")
    }

    pub(crate) fn join_failed(detail: Option<&str>) -> Self {
        Self::new(
            NoticeKind::JoinFailed,
            "Failed",
            detail.unwrap_or("This invite is invalid or has expired."),
        )
    }

    pub(crate) fn join_retryable(kept_for_retry: bool) -> Self {
        let message = if kept_for_retry {
            "Could not reach the server. We'll try the invite again later."
        } else {
            "Could not reach the server. Please open the invite again."
        };
        Self::new(NoticeKind::JoinRetryable, "Connection problem", message)
    }

    pub(crate) fn session_expired() -> Self {
        Self::new(
            NoticeKind::SessionExpired,
            "Session expired",
            "Please sign in again to join the group.",
        )
    }

    pub(crate) fn invalid_code() -> Self {
        Self::new(
            NoticeKind::InvalidCode,
            "Invalid QR",
            "This is not a Lunch Buddy code.",
        )
    }
}

/// A single observable effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Replace the current screen.
    Navigate(Route),
    /// Show a notice.
    Notice(Notice),
}

/// Receiver of effects.
///
/// Emission must not block; implementations queue the effect for the UI.
pub trait EffectSink: Send + Sync {
    /// Queues an effect.
    fn emit(&self, effect: Effect);
}

impl EffectSink for UnboundedSender<Effect> {
    fn emit(&self, effect: Effect) {
        if let Err(e) = self.send(effect) {
            log::debug!("Effect dropped, shell receiver closed: {:?}", e.0);
        }
    }
}

/// Sink that records every effect in order.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct RecordingSink {
    effects: std::sync::Mutex<Vec<Effect>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded effects.
    #[must_use]
    pub fn effects(&self) -> Vec<Effect> {
        self.effects.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Returns recorded navigations in order.
    #[must_use]
    pub fn navigations(&self) -> Vec<Route> {
        self.effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Navigate(route) => Some(route),
                Effect::Notice(_) => None,
            })
            .collect()
    }

    /// Returns recorded notice kinds in order.
    #[must_use]
    pub fn notice_kinds(&self) -> Vec<NoticeKind> {
        self.effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Notice(notice) => Some(notice.kind),
                Effect::Navigate(_) => None,
            })
            .collect()
    }

    /// Drops everything recorded so far.
    pub fn clear(&self) {
        if let Ok(mut effects) = self.effects.lock() {
            effects.clear();
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl EffectSink for RecordingSink {
    fn emit(&self, effect: Effect) {
        if let Ok(mut effects) = self.effects.lock() {
            effects.push(effect);
        }
    }
}
