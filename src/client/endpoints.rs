//! Typed backend endpoints.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::ApiResult;
use super::gateway::{HttpGateway, OnUnauthorized};
use super::types::{
    Group, InviteShare, JoinReceipt, JoinRequest, NewGroup, NewUser, PasswordForm, TokenResponse,
    User,
};

/// Backend operations consumed by the core.
///
/// [`HttpApi`] is the production implementation. Tests substitute a
/// scripted implementation to drive the session and join workflows.
#[async_trait]
pub trait LunchBuddyApi: Send + Sync {
    /// Exchanges email and password for an access token.
    async fn login_with_password(&self, email: &str, password: &str) -> ApiResult<TokenResponse>;

    /// Provisions a guest account and returns its access token.
    async fn login_guest(&self) -> ApiResult<TokenResponse>;

    /// Registers a new account.
    async fn sign_up(&self, new_user: &NewUser) -> ApiResult<User>;

    /// Fetches the user behind the stored credential.
    async fn current_user(&self) -> ApiResult<User>;

    /// Lists the groups the current user belongs to.
    async fn list_groups(&self) -> ApiResult<Vec<Group>>;

    /// Creates a group with the current user as admin.
    async fn create_group(&self, new_group: &NewGroup) -> ApiResult<Group>;

    /// Mints an invite link for a group.
    async fn create_invite(&self, group_id: i64) -> ApiResult<InviteShare>;

    /// Redeems an invite token for the current user.
    async fn join_by_token(&self, token: &str) -> ApiResult<JoinReceipt>;
}

/// [`LunchBuddyApi`] over the HTTP gateway.
#[derive(Debug, Clone)]
pub struct HttpApi {
    gateway: Arc<HttpGateway>,
}

impl HttpApi {
    /// Wraps a gateway.
    #[must_use]
    pub const fn new(gateway: Arc<HttpGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl LunchBuddyApi for HttpApi {
    async fn login_with_password(&self, email: &str, password: &str) -> ApiResult<TokenResponse> {
        let form = PasswordForm {
            username: email,
            password,
        };
        self.gateway
            .post_form("/auth/login/access-token", &form)
            .await
    }

    async fn login_guest(&self) -> ApiResult<TokenResponse> {
        self.gateway.post_empty("/auth/login/guest").await
    }

    async fn sign_up(&self, new_user: &NewUser) -> ApiResult<User> {
        self.gateway.post_json("/auth/signup", new_user).await
    }

    async fn current_user(&self) -> ApiResult<User> {
        // The session layer decides what a rejected credential means here.
        self.gateway
            .get_json("/auth/me", OnUnauthorized::ClearOnly)
            .await
    }

    async fn list_groups(&self) -> ApiResult<Vec<Group>> {
        self.gateway
            .get_json("/groups/", OnUnauthorized::Redirect)
            .await
    }

    async fn create_group(&self, new_group: &NewGroup) -> ApiResult<Group> {
        self.gateway.post_json("/groups/", new_group).await
    }

    async fn create_invite(&self, group_id: i64) -> ApiResult<InviteShare> {
        self.gateway
            .post_empty(&format!("/groups/{group_id}/invite"))
            .await
    }

    async fn join_by_token(&self, token: &str) -> ApiResult<JoinReceipt> {
        self.gateway
            .post_json("/groups/join-by-token", &JoinRequest { token })
            .await
    }
}
