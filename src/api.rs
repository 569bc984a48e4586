//! Entry point used by the app shell.
//!
//! [`LunchBuddyCore`] wires the HTTP client, the session and the invite
//! workflow together. The shell feeds it link events and user actions and
//! drains [`Effect`](crate::join::Effect)s from the sink it supplied.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::client::{
    ApiResult, Group, HttpApi, HttpGateway, InviteShare, LunchBuddyApi, NewGroup, NewUser, User,
};
use crate::config::ClientConfig;
use crate::error::CoreResult;
use crate::invite::{InviteJoinClient, InviteLinkParser, JoinOutcome, PendingInviteStore};
use crate::join::{
    DeepLinkListener, EffectSink, JoinOrchestrator, LinkDisposition, LinkEvent, LinkPhase,
    Route, RouteGuard, RouteSection,
};
use crate::session::{self, Identity, Session, SessionManager};
use crate::storage::{CredentialStore, SqliteStore};

/// Core interface for Lunch Buddy.
pub struct LunchBuddyCore {
    config: ClientConfig,
    api: Arc<dyn LunchBuddyApi>,
    session: Arc<SessionManager>,
    orchestrator: Arc<JoinOrchestrator>,
    listener: Arc<DeepLinkListener>,
    watching: AtomicBool,
}

impl std::fmt::Debug for LunchBuddyCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LunchBuddyCore")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl LunchBuddyCore {
    /// Creates a core talking to the configured backend.
    ///
    /// `credentials` is the platform secure store; `pending` holds the
    /// deferred invite.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: ClientConfig,
        credentials: Arc<dyn CredentialStore>,
        pending: Arc<dyn PendingInviteStore>,
        effects: Arc<dyn EffectSink>,
    ) -> ApiResult<Self> {
        let gateway = HttpGateway::new(config.clone(), credentials.clone(), effects.clone())?;
        let api = Arc::new(HttpApi::new(Arc::new(gateway)));
        Ok(Self::with_api(config, api, credentials, pending, effects))
    }

    /// Creates a core that keeps the deferred invite in `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`](crate::CoreError::Storage) if the
    /// database cannot be opened, or [`CoreError::Api`](crate::CoreError::Api)
    /// if the HTTP client cannot be built.
    pub fn open(
        config: ClientConfig,
        data_dir: &Path,
        credentials: Arc<dyn CredentialStore>,
        effects: Arc<dyn EffectSink>,
    ) -> CoreResult<Self> {
        let pending = Arc::new(SqliteStore::open_in_dir(data_dir)?);
        Ok(Self::new(config, credentials, pending, effects)?)
    }

    /// Creates a core over an arbitrary backend implementation.
    #[must_use]
    pub fn with_api(
        config: ClientConfig,
        api: Arc<dyn LunchBuddyApi>,
        credentials: Arc<dyn CredentialStore>,
        pending: Arc<dyn PendingInviteStore>,
        effects: Arc<dyn EffectSink>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(
            api.clone(),
            credentials,
            pending.clone(),
        ));
        let orchestrator = Arc::new(JoinOrchestrator::new(
            session.clone(),
            pending,
            InviteJoinClient::new(api.clone()),
            effects,
            InviteLinkParser::new(&config.link_scheme),
        ));
        Self {
            config,
            api,
            session,
            orchestrator,
            listener: Arc::new(DeepLinkListener::new()),
            watching: AtomicBool::new(false),
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the session manager.
    #[must_use]
    pub const fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Returns the join orchestrator.
    #[must_use]
    pub const fn orchestrator(&self) -> &Arc<JoinOrchestrator> {
        &self.orchestrator
    }

    /// Starts the core: begins watching the session for deferred invites
    /// and resolves the start-up identity.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(&self) -> Identity {
        self.spawn_session_watch();
        self.session.initialize().await
    }

    /// Spawns the task that flushes deferred invites on sign-in.
    ///
    /// Returns `None` if the task is already running.
    pub fn spawn_session_watch(&self) -> Option<JoinHandle<()>> {
        if self.watching.swap(true, Ordering::SeqCst) {
            return None;
        }
        let orchestrator = self.orchestrator.clone();
        Some(tokio::spawn(async move {
            orchestrator.watch_session().await;
        }))
    }

    /// Handles a link event from the OS.
    pub async fn handle_link_event(&self, event: LinkEvent) -> Option<LinkDisposition> {
        self.listener.dispatch(event, &self.orchestrator).await
    }

    /// Spawns a task that processes link events from `events` in order.
    pub fn spawn_link_listener(&self, events: UnboundedReceiver<LinkEvent>) -> JoinHandle<()> {
        let listener = self.listener.clone();
        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move {
            listener.run_channel(events, orchestrator).await;
        })
    }

    /// Handles a scanned QR code.
    pub async fn handle_scanned_code(&self, data: &str) -> LinkDisposition {
        self.orchestrator.handle_scanned_code(data).await
    }

    /// Redeems the deferred invite now, if the user can join.
    pub async fn flush_pending_invite(&self) -> Option<JoinOutcome> {
        self.orchestrator.flush_pending_invite().await
    }

    /// Returns the current session.
    #[must_use]
    pub fn current_session(&self) -> Session {
        self.session.snapshot()
    }

    /// Returns the current link phase.
    #[must_use]
    pub fn link_phase(&self) -> LinkPhase {
        self.orchestrator.link_phase()
    }

    /// Returns a route guard bound to the live session.
    #[must_use]
    pub fn route_guard(&self) -> RouteGuard {
        self.orchestrator.route_guard()
    }

    /// Evaluates the route guard once.
    #[must_use]
    pub fn route_redirect(&self, section: RouteSection) -> Option<Route> {
        self.route_guard().redirect_for(section)
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::sign_in`].
    pub async fn sign_in(&self, email: &str, password: &str) -> session::Result<User> {
        self.session.sign_in(email, password).await
    }

    /// Registers and signs in.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::sign_up`].
    pub async fn sign_up(&self, new_user: &NewUser) -> session::Result<User> {
        self.session.sign_up(new_user).await
    }

    /// Continues as a guest.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::login_guest`].
    pub async fn login_guest(&self) -> session::Result<User> {
        self.session.login_guest().await
    }

    /// Signs out.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::logout`].
    pub fn logout(&self) -> session::Result<()> {
        self.session.logout()
    }

    /// Lists the groups of the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    pub async fn list_groups(&self) -> ApiResult<Vec<Group>> {
        self.api.list_groups().await
    }

    /// Creates a group owned by the current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    pub async fn create_group(&self, name: &str, description: Option<&str>) -> ApiResult<Group> {
        let new_group = NewGroup {
            name: name.trim().to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(ToString::to_string),
        };
        self.api.create_group(&new_group).await
    }

    /// Mints an invite link for a group.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    pub async fn create_invite(&self, group_id: i64) -> ApiResult<InviteShare> {
        self.api.create_invite(group_id).await
    }
}
