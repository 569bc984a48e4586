//! Deferred invite-join workflow.
//!
//! Given an invite link and the session, the [`JoinOrchestrator`] either
//! joins right away, parks the token in the [`PendingInviteStore`] and
//! sends the user to sign-in / sign-up, or ignores the link.
//!
//! | Identity        | Action                                        |
//! |-----------------|-----------------------------------------------|
//! | Unauthenticated | store token, navigate sign-in, notice         |
//! | Guest           | store token, navigate sign-up, notice         |
//! | Registered      | redeem now, store untouched                   |
//!
//! A parked token is flushed on the next transition into `Registered`.
//! For every decision, store mutation happens before navigation, and
//! navigation before the notice.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use super::effects::{Effect, EffectSink, Notice, Route};
use super::guard::{LinkPhase, RouteGuard};
use crate::invite::{InviteJoinClient, InviteLinkParser, InviteToken, JoinOutcome, PendingInviteStore};
use crate::session::{Identity, Session, SessionManager};

/// What happened to an incoming link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDisposition {
    /// Not an invite link.
    Ignored,
    /// Token parked until the user can join.
    Deferred(Route),
    /// Token redeemed immediately.
    Redeemed(JoinOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinSource {
    Link,
    Pending,
}

/// Keeps the link phase at `ProcessingLink` while at least one guard lives.
struct ProcessingGuard<'a> {
    in_flight: &'a AtomicUsize,
    phase: &'a watch::Sender<LinkPhase>,
}

impl<'a> ProcessingGuard<'a> {
    fn enter(in_flight: &'a AtomicUsize, phase: &'a watch::Sender<LinkPhase>) -> Self {
        if in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            phase.send_replace(LinkPhase::ProcessingLink);
        }
        Self { in_flight, phase }
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.phase.send_replace(LinkPhase::Idle);
        }
    }
}

/// Coordinates invite links, the session and the pending-invite slot.
pub struct JoinOrchestrator {
    session: Arc<SessionManager>,
    pending: Arc<dyn PendingInviteStore>,
    client: InviteJoinClient,
    effects: Arc<dyn EffectSink>,
    parser: InviteLinkParser,
    phase: watch::Sender<LinkPhase>,
    in_flight: AtomicUsize,
    flush_lock: Mutex<()>,
}

impl std::fmt::Debug for JoinOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinOrchestrator")
            .field("parser", &self.parser)
            .field("phase", &*self.phase.borrow())
            .finish_non_exhaustive()
    }
}

impl JoinOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        session: Arc<SessionManager>,
        pending: Arc<dyn PendingInviteStore>,
        client: InviteJoinClient,
        effects: Arc<dyn EffectSink>,
        parser: InviteLinkParser,
    ) -> Self {
        let (phase, _) = watch::channel(LinkPhase::Idle);
        Self {
            session,
            pending,
            client,
            effects,
            parser,
            phase,
            in_flight: AtomicUsize::new(0),
            flush_lock: Mutex::new(()),
        }
    }

    /// Returns the current link phase.
    #[must_use]
    pub fn link_phase(&self) -> LinkPhase {
        *self.phase.borrow()
    }

    /// Subscribes to link phase changes.
    #[must_use]
    pub fn subscribe_link_phase(&self) -> watch::Receiver<LinkPhase> {
        self.phase.subscribe()
    }

    /// Builds a route guard that yields while links are processed.
    #[must_use]
    pub fn route_guard(&self) -> RouteGuard {
        RouteGuard::new(self.session.subscribe(), self.phase.subscribe())
    }

    fn begin_processing(&self) -> ProcessingGuard<'_> {
        ProcessingGuard::enter(&self.in_flight, &self.phase)
    }

    fn emit(&self, effect: Effect) {
        self.effects.emit(effect);
    }

    /// Handles a deep link opened by the OS.
    ///
    /// Links that are not invites are ignored without any effect. While
    /// the session is still loading, the decision waits for it to resolve.
    pub async fn handle_incoming_link(&self, raw_url: &str) -> LinkDisposition {
        let Some(token) = self.parser.parse(raw_url) else {
            log::debug!("Ignoring non-invite link");
            return LinkDisposition::Ignored;
        };
        self.process_token(token).await
    }

    /// Handles the payload of a scanned QR code.
    ///
    /// Unlike deep links, a code that is not an invite is reported to the
    /// user since they scanned it on purpose.
    pub async fn handle_scanned_code(&self, data: &str) -> LinkDisposition {
        let Some(token) = self.parser.parse(data) else {
            log::info!("Scanned code is not a Lunch Buddy invite");
            self.emit(Effect::Notice(Notice::invalid_code()));
            return LinkDisposition::Ignored;
        };
        self.process_token(token).await
    }

    async fn process_token(&self, token: InviteToken) -> LinkDisposition {
        let _processing = self.begin_processing();
        let session = self.resolved_session().await;

        match session.identity {
            Identity::Unauthenticated => {
                self.defer(&token, Route::SignIn, Notice::login_required());
                LinkDisposition::Deferred(Route::SignIn)
            }
            Identity::Guest(_) => {
                self.defer(&token, Route::SignUp, Notice::register_to_join());
                LinkDisposition::Deferred(Route::SignUp)
            }
            Identity::Registered(_) => {
                let outcome = self.client.redeem(&token).await;
                self.apply_outcome(&token, &outcome, JoinSource::Link);
                LinkDisposition::Redeemed(outcome)
            }
        }
    }

    async fn resolved_session(&self) -> Session {
        let mut rx = self.session.subscribe();
        let resolved = rx.wait_for(|s| !s.loading).await.map(|s| s.clone());
        match resolved {
            Ok(session) => session,
            Err(_) => self.session.snapshot(),
        }
    }

    fn defer(&self, token: &InviteToken, route: Route, notice: Notice) {
        let notice = match self.pending.set(token) {
            Ok(()) => {
                log::info!(
                    "Deferred invite {} until the user can join",
                    token.redacted()
                );
                notice
            }
            Err(e) => {
                log::error!("Failed to persist deferred invite: {e}");
                Notice::join_retryable(false)
            }
        };
        self.emit(Effect::Navigate(route));
        self.emit(Effect::Notice(notice));
    }

    /// Redeems the deferred invite, if there is one.
    ///
    /// Returns `None` without calling the backend when the slot is empty
    /// or the session cannot join. Concurrent flushes are serialized.
    pub async fn flush_pending_invite(&self) -> Option<JoinOutcome> {
        let _flush = self.flush_lock.lock().await;

        if !self.session.snapshot().can_join() {
            log::debug!("Skipping invite flush, session cannot join");
            return None;
        }

        let token = match self.pending.get() {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => {
                log::error!("Failed to read deferred invite: {e}");
                return None;
            }
        };

        let _processing = self.begin_processing();
        log::info!("Flushing deferred invite {}", token.redacted());
        let outcome = self.client.redeem(&token).await;
        self.apply_outcome(&token, &outcome, JoinSource::Pending);
        Some(outcome)
    }

    /// Flushes the deferred invite on every transition into `Registered`.
    ///
    /// Runs until the session manager is dropped. The host spawns it once.
    pub async fn watch_session(&self) {
        let mut rx = self.session.subscribe();
        let mut was_registered = false;
        loop {
            let registered = rx.borrow_and_update().can_join();
            if registered && !was_registered {
                self.flush_pending_invite().await;
            }
            was_registered = registered;
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Applies a redemption result. The session may have changed while the
    /// request was in flight; effects that assume a signed-in user are only
    /// applied if the user can still join.
    fn apply_outcome(&self, token: &InviteToken, outcome: &JoinOutcome, source: JoinSource) {
        let signed_in = self.session.snapshot().can_join();
        match outcome {
            JoinOutcome::Joined(_) => {
                if source == JoinSource::Pending {
                    self.clear_if_current(token);
                }
                if signed_in {
                    self.emit(Effect::Navigate(Route::GroupList));
                } else {
                    log::info!("Session ended during join, staying on current screen");
                }
                self.emit(Effect::Notice(Notice::joined()));
            }
            JoinOutcome::InvalidOrExpired { detail } => {
                if source == JoinSource::Pending {
                    self.clear_if_current(token);
                }
                self.emit(Effect::Notice(Notice::join_failed(detail.as_deref())));
            }
            JoinOutcome::NetworkFailure { .. } => {
                self.emit(Effect::Notice(Notice::join_retryable(
                    source == JoinSource::Pending,
                )));
            }
            JoinOutcome::SessionExpired => {
                if !signed_in {
                    // Logout already dropped the invite and the credential.
                    log::info!("Join rejected after session ended, discarding invite");
                    return;
                }
                // Keep the invite so it is flushed after the next sign-in.
                if source == JoinSource::Link {
                    if let Err(e) = self.pending.set(token) {
                        log::error!("Failed to persist invite after session expiry: {e}");
                    }
                }
                self.session.expire();
                self.emit(Effect::Notice(Notice::session_expired()));
            }
        }
    }

    fn clear_if_current(&self, token: &InviteToken) {
        match self.pending.get() {
            Ok(Some(current)) if current == *token => {
                if let Err(e) = self.pending.clear() {
                    log::error!("Failed to clear deferred invite: {e}");
                }
            }
            Ok(_) => log::debug!("Deferred invite replaced while joining, keeping newer one"),
            Err(e) => log::error!("Failed to read deferred invite: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invite::MemoryPendingInviteStore;
    use crate::join::{NoticeKind, RecordingSink};
    use crate::storage::MemoryCredentialStore;
    use crate::testing::{guest_user, registered_user, FakeFailure, ScriptedApi};

    struct Fixture {
        api: Arc<ScriptedApi>,
        pending: Arc<MemoryPendingInviteStore>,
        sink: Arc<RecordingSink>,
        session: Arc<SessionManager>,
        orchestrator: Arc<JoinOrchestrator>,
    }

    fn fixture(api: ScriptedApi, pending: MemoryPendingInviteStore) -> Fixture {
        let api = Arc::new(api);
        let pending = Arc::new(pending);
        let sink = Arc::new(RecordingSink::new());
        let session = Arc::new(SessionManager::new(
            api.clone(),
            Arc::new(MemoryCredentialStore::new()),
            pending.clone(),
        ));
        let orchestrator = Arc::new(JoinOrchestrator::new(
            session.clone(),
            pending.clone(),
            InviteJoinClient::new(api.clone()),
            sink.clone(),
            InviteLinkParser::new("lunchbuddy"),
        ));
        Fixture {
            api,
            pending,
            sink,
            session,
            orchestrator,
        }
    }

    fn token(raw: &str) -> InviteToken {
        InviteToken::new(raw).unwrap()
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn processing_guard_nests() {
        let f = fixture(ScriptedApi::new(), MemoryPendingInviteStore::new());
        let o = &f.orchestrator;
        assert_eq!(o.link_phase(), LinkPhase::Idle);
        {
            let _a = o.begin_processing();
            {
                let _b = o.begin_processing();
                assert_eq!(o.link_phase(), LinkPhase::ProcessingLink);
            }
            assert_eq!(o.link_phase(), LinkPhase::ProcessingLink);
        }
        assert_eq!(o.link_phase(), LinkPhase::Idle);
    }

    #[tokio::test]
    async fn phase_returns_to_idle_after_link() {
        let f = fixture(ScriptedApi::new(), MemoryPendingInviteStore::new());
        f.session.expire();

        f.orchestrator
            .handle_incoming_link("lunchbuddy://group/join?token=abc123")
            .await;

        assert_eq!(f.orchestrator.link_phase(), LinkPhase::Idle);
    }

    #[tokio::test]
    async fn link_waits_for_session_to_resolve() {
        let f = fixture(
            ScriptedApi::new().with_me(guest_user(1)),
            MemoryPendingInviteStore::new(),
        );
        let orchestrator = f.orchestrator.clone();
        let handle = tokio::spawn(async move {
            orchestrator
                .handle_incoming_link("lunchbuddy://group/join?token=early")
                .await
        });
        settle().await;
        assert!(f.sink.effects().is_empty());
        assert_eq!(f.orchestrator.link_phase(), LinkPhase::ProcessingLink);

        f.session.initialize().await;
        let disposition = handle.await.unwrap();

        assert_eq!(disposition, LinkDisposition::Deferred(Route::SignUp));
        assert_eq!(f.pending.get().unwrap(), Some(token("early")));
        assert!(f.api.joined_tokens().is_empty());
    }

    #[tokio::test]
    async fn flush_skips_when_not_registered() {
        let f = fixture(
            ScriptedApi::new(),
            MemoryPendingInviteStore::holding("abc123"),
        );
        f.session.expire();

        assert!(f.orchestrator.flush_pending_invite().await.is_none());
        assert!(f.api.joined_tokens().is_empty());
        assert_eq!(f.pending.get().unwrap(), Some(token("abc123")));
    }

    #[tokio::test]
    async fn newer_token_survives_flush_of_older_one() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let f = fixture(
            ScriptedApi::new()
                .with_me(registered_user(1))
                .with_join_gate(gate.clone()),
            MemoryPendingInviteStore::holding("old"),
        );
        f.session
            .login(crate::storage::AccessToken::new("user-token"))
            .await
            .unwrap();

        let orchestrator = f.orchestrator.clone();
        let flush = tokio::spawn(async move { orchestrator.flush_pending_invite().await });
        settle().await;

        f.pending.set(&token("new")).unwrap();
        gate.notify_one();
        let outcome = flush.await.unwrap();

        assert!(matches!(outcome, Some(JoinOutcome::Joined(_))));
        assert_eq!(f.pending.get().unwrap(), Some(token("new")));
    }

    #[tokio::test]
    async fn session_expiry_during_join_keeps_token_for_later() {
        let f = fixture(
            ScriptedApi::new()
                .with_me(registered_user(1))
                .push_join(Err(FakeFailure::Unauthorized)),
            MemoryPendingInviteStore::new(),
        );
        f.session
            .login(crate::storage::AccessToken::new("user-token"))
            .await
            .unwrap();

        let disposition = f
            .orchestrator
            .handle_incoming_link("lunchbuddy://group/join?token=xyz")
            .await;

        assert_eq!(
            disposition,
            LinkDisposition::Redeemed(JoinOutcome::SessionExpired)
        );
        assert_eq!(f.pending.get().unwrap(), Some(token("xyz")));
        assert_eq!(f.session.snapshot().identity, Identity::Unauthenticated);
        assert_eq!(f.sink.notice_kinds(), vec![NoticeKind::SessionExpired]);
    }

    #[tokio::test]
    async fn join_finishing_after_logout_does_not_navigate_home() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let f = fixture(
            ScriptedApi::new()
                .with_me(registered_user(1))
                .with_join_gate(gate.clone()),
            MemoryPendingInviteStore::new(),
        );
        f.session
            .login(crate::storage::AccessToken::new("user-token"))
            .await
            .unwrap();

        let orchestrator = f.orchestrator.clone();
        let join = tokio::spawn(async move {
            orchestrator
                .handle_incoming_link("lunchbuddy://group/join?token=late")
                .await
        });
        settle().await;
        f.session.logout().unwrap();
        gate.notify_one();
        let disposition = join.await.unwrap();

        assert!(matches!(
            disposition,
            LinkDisposition::Redeemed(JoinOutcome::Joined(_))
        ));
        assert!(f.sink.navigations().is_empty());
        assert_eq!(f.sink.notice_kinds(), vec![NoticeKind::Joined]);
    }

    #[tokio::test]
    async fn expiry_after_logout_does_not_resurrect_invite() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let f = fixture(
            ScriptedApi::new()
                .with_me(registered_user(1))
                .push_join(Err(FakeFailure::Unauthorized))
                .with_join_gate(gate.clone()),
            MemoryPendingInviteStore::new(),
        );
        f.session
            .login(crate::storage::AccessToken::new("user-token"))
            .await
            .unwrap();

        let orchestrator = f.orchestrator.clone();
        let join = tokio::spawn(async move {
            orchestrator
                .handle_incoming_link("lunchbuddy://group/join?token=late")
                .await
        });
        settle().await;
        f.session.logout().unwrap();
        gate.notify_one();
        join.await.unwrap();

        assert!(f.pending.get().unwrap().is_none());
        assert!(f.sink.effects().is_empty());
        assert_eq!(f.session.snapshot().identity, Identity::Unauthenticated);
    }

    struct ReadOnlyStore;

    impl PendingInviteStore for ReadOnlyStore {
        fn set(&self, _token: &InviteToken) -> crate::storage::Result<()> {
            Err(crate::storage::StorageError::Lock("disk full".to_string()))
        }

        fn get(&self) -> crate::storage::Result<Option<InviteToken>> {
            Ok(None)
        }

        fn clear(&self) -> crate::storage::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_deferral_still_navigates_and_asks_to_retry() {
        let api = Arc::new(ScriptedApi::new());
        let sink = Arc::new(RecordingSink::new());
        let pending: Arc<dyn PendingInviteStore> = Arc::new(ReadOnlyStore);
        let session = Arc::new(SessionManager::new(
            api.clone(),
            Arc::new(MemoryCredentialStore::new()),
            pending.clone(),
        ));
        session.expire();
        let orchestrator = JoinOrchestrator::new(
            session,
            pending,
            InviteJoinClient::new(api),
            sink.clone(),
            InviteLinkParser::new("lunchbuddy"),
        );

        let disposition = orchestrator
            .handle_incoming_link("lunchbuddy://group/join?token=abc123")
            .await;

        assert_eq!(disposition, LinkDisposition::Deferred(Route::SignIn));
        assert_eq!(sink.navigations(), vec![Route::SignIn]);
        assert_eq!(sink.notice_kinds(), vec![NoticeKind::JoinRetryable]);
    }

    #[tokio::test]
    async fn scanned_garbage_surfaces_invalid_code() {
        let f = fixture(ScriptedApi::new(), MemoryPendingInviteStore::new());

        let disposition = f.orchestrator.handle_scanned_code("https://example.com").await;

        assert_eq!(disposition, LinkDisposition::Ignored);
        assert_eq!(f.sink.notice_kinds(), vec![NoticeKind::InvalidCode]);
        assert!(f.sink.navigations().is_empty());
        assert!(f.pending.get().unwrap().is_none());
    }

    #[tokio::test]
    async fn route_guard_is_silent_while_processing() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let f = fixture(
            ScriptedApi::new()
                .with_me(registered_user(1))
                .with_join_gate(gate.clone()),
            MemoryPendingInviteStore::new(),
        );
        f.session
            .login(crate::storage::AccessToken::new("user-token"))
            .await
            .unwrap();
        let guard = f.orchestrator.route_guard();

        let orchestrator = f.orchestrator.clone();
        let join = tokio::spawn(async move {
            orchestrator
                .handle_incoming_link("lunchbuddy://group/join?token=xyz")
                .await
        });
        settle().await;

        assert_eq!(guard.redirect_for(crate::join::RouteSection::Auth), None);
        gate.notify_one();
        join.await.unwrap();
        assert_eq!(
            guard.redirect_for(crate::join::RouteSection::Auth),
            Some(Route::GroupList)
        );
    }
}
