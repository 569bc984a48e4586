//! Reusable test helpers for the invite workflow integration tests.
//!
//! A [`Harness`] wires a real [`LunchBuddyCore`] to the scripted backend
//! from `lunch_buddy_core::testing`, an in-memory credential store and a
//! recording effect sink. The pending-invite slot is either in memory or
//! a real `SQLite` file in a temporary directory.

#![allow(dead_code)]

use std::sync::Arc;

use lunch_buddy_core::invite::{MemoryPendingInviteStore, PendingInviteStore};
use lunch_buddy_core::join::RecordingSink;
use lunch_buddy_core::storage::{MemoryCredentialStore, SqliteStore, ACCESS_TOKEN_KEY};
use lunch_buddy_core::testing::{ScriptedApi, USER_TOKEN};
use lunch_buddy_core::{ClientConfig, LunchBuddyCore};
use tempfile::TempDir;

/// Link scheme used throughout the tests.
pub const SCHEME: &str = "lunchbuddy";

/// Builds a canonical invite link.
pub fn invite_link(token: &str) -> String {
    format!("{SCHEME}://group/join?token={token}")
}

/// Lets spawned tasks run to completion on the current-thread runtime.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// A durable pending-invite store in its own temporary directory.
pub struct TempStore {
    pub dir: TempDir,
    pub store: Arc<SqliteStore>,
}

impl TempStore {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let store = Arc::new(SqliteStore::open_in_dir(dir.path()).expect("should open store"));
        Self { dir, store }
    }

    /// Opens a second connection to the same database file, as after a restart.
    pub fn reopen(&self) -> Arc<SqliteStore> {
        Arc::new(SqliteStore::open_in_dir(self.dir.path()).expect("should reopen store"))
    }
}

/// Core plus handles on every collaborator.
pub struct Harness {
    pub api: Arc<ScriptedApi>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub pending: Arc<dyn PendingInviteStore>,
    pub sink: Arc<RecordingSink>,
    pub core: LunchBuddyCore,
}

impl Harness {
    /// No stored credential and an empty in-memory pending slot.
    pub fn fresh(api: ScriptedApi) -> Self {
        Self::with_parts(
            api,
            MemoryCredentialStore::new(),
            Arc::new(MemoryPendingInviteStore::new()),
        )
    }

    /// A stored registered-user credential.
    pub fn signed_in(api: ScriptedApi) -> Self {
        Self::with_parts(
            api,
            MemoryCredentialStore::with_entry(ACCESS_TOKEN_KEY, USER_TOKEN),
            Arc::new(MemoryPendingInviteStore::new()),
        )
    }

    pub fn with_parts(
        api: ScriptedApi,
        credentials: MemoryCredentialStore,
        pending: Arc<dyn PendingInviteStore>,
    ) -> Self {
        let api = Arc::new(api);
        let credentials = Arc::new(credentials);
        let sink = Arc::new(RecordingSink::new());
        let core = LunchBuddyCore::with_api(
            ClientConfig::default().with_link_scheme(SCHEME),
            api.clone(),
            credentials.clone(),
            pending.clone(),
            sink.clone(),
        );
        Self {
            api,
            credentials,
            pending,
            sink,
            core,
        }
    }

    /// Returns the deferred token, if any.
    pub fn pending_token(&self) -> Option<String> {
        self.pending
            .get()
            .expect("pending store should be readable")
            .map(|t| t.as_str().to_string())
    }
}
