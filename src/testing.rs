//! Test doubles for the backend.
//!
//! [`ScriptedApi`] answers every [`LunchBuddyApi`] call from a script and
//! records the calls it received. Only compiled for tests or with the
//! `test-utils` feature.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::client::{
    ApiError, ApiResult, Group, InviteShare, JoinReceipt, LunchBuddyApi, NewGroup, NewUser,
    TokenResponse, User,
};

/// Token returned by the scripted guest login.
pub const GUEST_TOKEN: &str = "guest-token";

/// Token returned by the scripted password login.
pub const USER_TOKEN: &str = "user-token";

/// Cloneable failure that is turned into an [`ApiError`] when replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeFailure {
    /// 401/403 from the backend.
    Unauthorized,
    /// Non-success status with a detail message.
    Rejected(u16, String),
    /// Transport failure.
    Network,
}

impl From<FakeFailure> for ApiError {
    fn from(failure: FakeFailure) -> Self {
        match failure {
            FakeFailure::Unauthorized => Self::Unauthorized,
            FakeFailure::Rejected(status, detail) => Self::Rejected { status, detail },
            FakeFailure::Network => Self::Network("connection refused".to_string()),
        }
    }
}

/// Call received by the [`ScriptedApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    /// `POST /auth/login/access-token`
    LoginWithPassword(String),
    /// `POST /auth/login/guest`
    LoginGuest,
    /// `POST /auth/signup`
    SignUp(String),
    /// `GET /auth/me`
    CurrentUser,
    /// `GET /groups/`
    ListGroups,
    /// `POST /groups/`
    CreateGroup(String),
    /// `POST /groups/{id}/invite`
    CreateInvite(i64),
    /// `POST /groups/join-by-token`
    JoinByToken(String),
}

struct Script {
    guest_login: Result<String, FakeFailure>,
    password_login: Result<String, FakeFailure>,
    sign_up: Result<User, FakeFailure>,
    me_queue: VecDeque<Result<User, FakeFailure>>,
    me_fallback: Result<User, FakeFailure>,
    join_queue: VecDeque<Result<JoinReceipt, FakeFailure>>,
    groups: Vec<Group>,
    calls: Vec<ApiCall>,
}

/// Scripted [`LunchBuddyApi`].
pub struct ScriptedApi {
    script: Mutex<Script>,
    join_gate: Option<Arc<Notify>>,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedApi {
    /// Creates a script where logins succeed, `GET /auth/me` is rejected
    /// and every join succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                guest_login: Ok(GUEST_TOKEN.to_string()),
                password_login: Ok(USER_TOKEN.to_string()),
                sign_up: Ok(registered_user(100)),
                me_queue: VecDeque::new(),
                me_fallback: Err(FakeFailure::Unauthorized),
                join_queue: VecDeque::new(),
                groups: Vec::new(),
                calls: Vec::new(),
            }),
            join_gate: None,
        }
    }

    fn with_script(self, f: impl FnOnce(&mut Script)) -> Self {
        if let Ok(mut script) = self.script.lock() {
            f(&mut script);
        }
        self
    }

    /// `GET /auth/me` returns `user` once the queue is drained.
    #[must_use]
    pub fn with_me(self, user: User) -> Self {
        self.with_script(|s| s.me_fallback = Ok(user))
    }

    /// Queues a one-off `GET /auth/me` answer.
    #[must_use]
    pub fn push_me(self, reply: Result<User, FakeFailure>) -> Self {
        self.with_script(|s| s.me_queue.push_back(reply))
    }

    /// Makes the guest login fail.
    #[must_use]
    pub fn fail_guest_login(self, failure: FakeFailure) -> Self {
        self.with_script(|s| s.guest_login = Err(failure))
    }

    /// Makes the password login fail.
    #[must_use]
    pub fn fail_password_login(self, failure: FakeFailure) -> Self {
        self.with_script(|s| s.password_login = Err(failure))
    }

    /// Queues a one-off join answer. Joins succeed once the queue is empty.
    #[must_use]
    pub fn push_join(self, reply: Result<JoinReceipt, FakeFailure>) -> Self {
        self.with_script(|s| s.join_queue.push_back(reply))
    }

    /// Seeds the group list.
    #[must_use]
    pub fn with_groups(self, groups: Vec<Group>) -> Self {
        self.with_script(|s| s.groups = groups)
    }

    /// Holds every join call until `gate` is notified.
    #[must_use]
    pub fn with_join_gate(mut self, gate: Arc<Notify>) -> Self {
        self.join_gate = Some(gate);
        self
    }

    /// Returns all calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.script
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    /// Returns the tokens passed to `join_by_token`, in order.
    #[must_use]
    pub fn joined_tokens(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::JoinByToken(token) => Some(token),
                _ => None,
            })
            .collect()
    }

    /// Returns how many guest logins were attempted.
    #[must_use]
    pub fn guest_login_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == ApiCall::LoginGuest)
            .count()
    }

    fn record<T>(
        &self,
        call: ApiCall,
        f: impl FnOnce(&mut Script) -> Result<T, FakeFailure>,
    ) -> ApiResult<T> {
        let mut script = self
            .script
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        script.calls.push(call);
        f(&mut script).map_err(ApiError::from)
    }
}

fn token_response(token: String) -> TokenResponse {
    TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }
}

#[async_trait]
impl LunchBuddyApi for ScriptedApi {
    async fn login_with_password(&self, email: &str, _password: &str) -> ApiResult<TokenResponse> {
        self.record(ApiCall::LoginWithPassword(email.to_string()), |s| {
            s.password_login.clone().map(token_response)
        })
    }

    async fn login_guest(&self) -> ApiResult<TokenResponse> {
        self.record(ApiCall::LoginGuest, |s| {
            s.guest_login.clone().map(token_response)
        })
    }

    async fn sign_up(&self, new_user: &NewUser) -> ApiResult<User> {
        self.record(ApiCall::SignUp(new_user.email.clone()), |s| s.sign_up.clone())
    }

    async fn current_user(&self) -> ApiResult<User> {
        self.record(ApiCall::CurrentUser, |s| {
            s.me_queue
                .pop_front()
                .unwrap_or_else(|| s.me_fallback.clone())
        })
    }

    async fn list_groups(&self) -> ApiResult<Vec<Group>> {
        self.record(ApiCall::ListGroups, |s| Ok(s.groups.clone()))
    }

    async fn create_group(&self, new_group: &NewGroup) -> ApiResult<Group> {
        self.record(ApiCall::CreateGroup(new_group.name.clone()), |s| {
            let id = i64::try_from(s.groups.len()).unwrap_or(i64::MAX) + 1;
            let group = Group {
                id,
                name: new_group.name.clone(),
                description: new_group.description.clone(),
            };
            s.groups.push(group.clone());
            Ok(group)
        })
    }

    async fn create_invite(&self, group_id: i64) -> ApiResult<InviteShare> {
        self.record(ApiCall::CreateInvite(group_id), |_| {
            let link = format!("lunchbuddy://group/join?token=invite-{group_id}");
            let expires_at = chrono::Utc::now().naive_utc() + chrono::Duration::hours(24);
            Ok(InviteShare {
                invite_url: link.clone(),
                qr_code_data: link,
                expires_at,
            })
        })
    }

    async fn join_by_token(&self, token: &str) -> ApiResult<JoinReceipt> {
        let reply = self.record(ApiCall::JoinByToken(token.to_string()), |s| {
            s.join_queue.pop_front().unwrap_or_else(|| {
                Ok(JoinReceipt {
                    message: "Successfully joined the group via invite".to_string(),
                })
            })
        });
        if let Some(gate) = &self.join_gate {
            gate.notified().await;
        }
        reply
    }
}

/// Registered user fixture.
#[must_use]
pub fn registered_user(id: i64) -> User {
    User {
        id,
        email: format!("user{id}@lunch.test"),
        username: Some(format!("user{id}")),
        first_name: "Lunch".to_string(),
        last_name: format!("User{id}"),
        is_active: true,
        is_guest: false,
    }
}

/// Guest user fixture.
#[must_use]
pub fn guest_user(id: i64) -> User {
    User {
        id,
        email: format!("guest_{id}@lunch.local"),
        username: None,
        first_name: String::new(),
        last_name: String::new(),
        is_active: true,
        is_guest: true,
    }
}
