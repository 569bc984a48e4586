//! Wire types exchanged with the backend.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::storage::AccessToken;

/// Response of the login endpoints.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer credential.
    pub access_token: String,
    /// Always `bearer` for this backend.
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenResponse {
    /// Converts the response into a zeroizing [`AccessToken`].
    #[must_use]
    pub fn into_access_token(self) -> AccessToken {
        AccessToken::new(self.access_token)
    }
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

const fn default_true() -> bool {
    true
}

/// User record returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend user ID.
    pub id: i64,
    /// Email address (synthetic for guest accounts).
    pub email: String,
    /// Login name, if the backend reports one.
    #[serde(default)]
    pub username: Option<String>,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Whether the account is active.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Whether this is a provisional guest account.
    #[serde(default)]
    pub is_guest: bool,
}

impl User {
    /// Returns "First Last", falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

/// Registration payload for `POST /auth/signup`.
#[derive(Clone, Serialize)]
pub struct NewUser {
    /// Email address, also used as the login name.
    pub email: String,
    /// Display handle.
    pub username: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Plaintext password, sent once over TLS.
    pub password: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A lunch group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Backend group ID.
    pub id: i64,
    /// Group name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Payload for `POST /groups/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewGroup {
    /// Group name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Invitation minted by `POST /groups/{id}/invite`.
///
/// `invite_url` and `qr_code_data` both carry the deep link; the shell
/// renders the latter as a QR code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InviteShare {
    /// Deep link to share.
    pub invite_url: String,
    /// Payload to encode in the QR code.
    pub qr_code_data: String,
    /// Server-local expiry time.
    pub expires_at: NaiveDateTime,
}

impl InviteShare {
    /// Returns true once `now` has reached the expiry time.
    #[must_use]
    pub fn is_expired_at(&self, now: NaiveDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Confirmation body of a successful join.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JoinReceipt {
    /// Backend message, e.g. "Successfully joined the group via invite".
    #[serde(rename = "msg", default)]
    pub message: String,
}

#[derive(Serialize)]
pub(crate) struct JoinRequest<'a> {
    pub token: &'a str,
}

#[derive(Serialize)]
pub(crate) struct PasswordForm<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Extracts a readable message from a `FastAPI` error body.
///
/// Handles both `{"detail": "..."}` and validation errors of the form
/// `{"detail": [{"msg": "..."}]}`. Falls back to the raw body.
#[must_use]
pub fn error_detail(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let detail = parsed.as_ref().and_then(|v| v.get("detail"));
    match detail {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(items)) => items
            .first()
            .and_then(|item| item.get("msg"))
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| body.trim().to_string(), ToString::to_string),
        _ => body.trim().to_string(),
    }
}
