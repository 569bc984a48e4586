//! Authenticated HTTP gateway to the Lunch Buddy backend.
//!
//! Every request goes through [`HttpGateway`], which:
//!
//! - attaches the stored bearer credential when one exists
//! - applies the configured request timeout
//! - turns non-success responses into [`ApiError`]s with the server detail
//! - on 401/403, clears the credential and asks the shell to show sign-in

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{ApiError, ApiResult};
use super::types::error_detail;
use crate::config::ClientConfig;
use crate::join::{Effect, EffectSink, Route};
use crate::storage::{CredentialStore, CredentialStoreExt};

/// What to do when the backend rejects the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnUnauthorized {
    /// Clear the credential and emit a sign-in redirect.
    Redirect,
    /// Clear the credential only; the caller resolves the session itself.
    ClearOnly,
}

/// HTTP gateway shared by all API calls.
pub struct HttpGateway {
    http: reqwest::Client,
    config: ClientConfig,
    credentials: Arc<dyn CredentialStore>,
    effects: Arc<dyn EffectSink>,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    /// Creates a gateway for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Initialization`] if the HTTP client cannot be built.
    pub fn new(
        config: ClientConfig,
        credentials: Arc<dyn CredentialStore>,
        effects: Arc<dyn EffectSink>,
    ) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Initialization(e.to_string()))?;
        Ok(Self {
            http,
            config,
            credentials,
            effects,
        })
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let builder = self.http.request(method, self.config.endpoint(path));
        Ok(match self.credentials.access_token()? {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        })
    }

    /// Issues a GET and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        on_unauthorized: OnUnauthorized,
    ) -> ApiResult<T> {
        let builder = self.request(Method::GET, path)?;
        self.send(builder, path, on_unauthorized).await
    }

    /// Issues a POST with a JSON body and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode.
    pub async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let builder = self.request(Method::POST, path)?.json(body);
        self.send(builder, path, OnUnauthorized::Redirect).await
    }

    /// Issues a POST with a form-encoded body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode.
    pub async fn post_form<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        form: &B,
    ) -> ApiResult<T> {
        let builder = self.request(Method::POST, path)?.form(form);
        self.send(builder, path, OnUnauthorized::Redirect).await
    }

    /// Issues a POST without a body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let builder = self.request(Method::POST, path)?;
        self.send(builder, path, OnUnauthorized::Redirect).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        path: &str,
        on_unauthorized: OnUnauthorized,
    ) -> ApiResult<T> {
        let response = builder.send().await.map_err(|e| {
            log::warn!("Network error on {path}: {e}");
            ApiError::from(e)
        })?;

        let status = response.status();
        if is_auth_failure(status) {
            log::warn!("Credential rejected on {path} ({status})");
            self.handle_unauthorized(on_unauthorized)?;
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body);
            log::error!("API error on {path} ({status}): {detail}");
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn handle_unauthorized(&self, on_unauthorized: OnUnauthorized) -> ApiResult<()> {
        self.credentials.clear_access_token()?;
        if on_unauthorized == OnUnauthorized::Redirect {
            self.effects.emit(Effect::Navigate(Route::SignIn));
        }
        Ok(())
    }
}

/// Returns whether a status means the credential was rejected.
///
/// The backend answers 401 when no credential is sent and 403 when the
/// credential cannot be validated.
#[must_use]
pub fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::RecordingSink;
    use crate::storage::{AccessToken, MemoryCredentialStore};

    fn gateway() -> (HttpGateway, Arc<MemoryCredentialStore>, Arc<RecordingSink>) {
        let creds = Arc::new(MemoryCredentialStore::new());
        let sink = Arc::new(RecordingSink::new());
        let gw = HttpGateway::new(ClientConfig::default(), creds.clone(), sink.clone()).unwrap();
        (gw, creds, sink)
    }

    #[test]
    fn auth_failure_statuses() {
        assert!(is_auth_failure(StatusCode::UNAUTHORIZED));
        assert!(is_auth_failure(StatusCode::FORBIDDEN));
        assert!(!is_auth_failure(StatusCode::BAD_REQUEST));
        assert!(!is_auth_failure(StatusCode::OK));
    }

    #[test]
    fn unauthorized_redirect_clears_credential_and_navigates() {
        let (gw, creds, sink) = gateway();
        creds.set_access_token(&AccessToken::new("stale")).unwrap();

        gw.handle_unauthorized(OnUnauthorized::Redirect).unwrap();

        assert!(creds.access_token().unwrap().is_none());
        assert_eq!(sink.navigations(), vec![Route::SignIn]);
    }

    #[test]
    fn unauthorized_clear_only_does_not_navigate() {
        let (gw, creds, sink) = gateway();
        creds.set_access_token(&AccessToken::new("stale")).unwrap();

        gw.handle_unauthorized(OnUnauthorized::ClearOnly).unwrap();

        assert!(creds.access_token().unwrap().is_none());
        assert!(sink.effects().is_empty());
    }

    /// Serves one canned response on a local port and returns the base URL
    /// plus a handle yielding the raw request head.
    async fn serve_once(
        status: &str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&head).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    fn gateway_at(
        base_url: &str,
    ) -> (HttpGateway, Arc<MemoryCredentialStore>, Arc<RecordingSink>) {
        let creds = Arc::new(MemoryCredentialStore::new());
        let sink = Arc::new(RecordingSink::new());
        let config = ClientConfig::default().with_api_base_url(base_url);
        let gw = HttpGateway::new(config, creds.clone(), sink.clone()).unwrap();
        (gw, creds, sink)
    }

    #[tokio::test]
    async fn forbidden_response_clears_credential_and_redirects() {
        let (url, server) =
            serve_once("403 Forbidden", r#"{"detail":"Could not validate credentials"}"#).await;
        let (gw, creds, sink) = gateway_at(&url);
        creds.set_access_token(&AccessToken::new("stale")).unwrap();

        let result: ApiResult<serde_json::Value> = gw.post_empty("/groups/join/abc123").await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert!(creds.access_token().unwrap().is_none());
        assert_eq!(sink.navigations(), vec![Route::SignIn]);
        let head = server.await.unwrap();
        assert!(head.starts_with("POST /groups/join/abc123 "));
        assert!(head.to_ascii_lowercase().contains("authorization: bearer stale"));
    }

    #[tokio::test]
    async fn unauthorized_response_with_clear_only_emits_nothing() {
        let (url, server) =
            serve_once("401 Unauthorized", r#"{"detail":"Not authenticated"}"#).await;
        let (gw, creds, sink) = gateway_at(&url);
        creds.set_access_token(&AccessToken::new("stale")).unwrap();

        let result: ApiResult<serde_json::Value> =
            gw.get_json("/auth/me", OnUnauthorized::ClearOnly).await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert!(creds.access_token().unwrap().is_none());
        assert!(sink.effects().is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn bad_request_carries_server_detail() {
        let (url, server) =
            serve_once("400 Bad Request", r#"{"detail":"Invalid or expired token"}"#).await;
        let (gw, creds, sink) = gateway_at(&url);
        creds.set_access_token(&AccessToken::new("user")).unwrap();

        let err = gw
            .post_empty::<serde_json::Value>("/groups/join/abc123")
            .await
            .unwrap_err();

        assert!(
            matches!(&err, ApiError::Rejected { status: 400, detail } if detail == "Invalid or expired token"),
            "got {err:?}"
        );
        assert!(!err.is_transient());
        assert!(creds.access_token().unwrap().is_some());
        assert!(sink.effects().is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let (url, server) =
            serve_once("503 Service Unavailable", r#"{"detail":"down"}"#).await;
        let (gw, _creds, sink) = gateway_at(&url);

        let err = gw
            .get_json::<serde_json::Value>("/groups", OnUnauthorized::Redirect)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Rejected { status: 503, .. }), "got {err:?}");
        assert!(err.is_transient());
        assert!(sink.effects().is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn success_body_is_decoded_without_credential() {
        let (url, server) = serve_once("200 OK", r#"{"id":7}"#).await;
        let (gw, _creds, _sink) = gateway_at(&url);

        let value: serde_json::Value = gw
            .get_json("/groups", OnUnauthorized::Redirect)
            .await
            .unwrap();

        assert_eq!(value["id"], 7);
        let head = server.await.unwrap();
        assert!(!head.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        let creds = Arc::new(MemoryCredentialStore::new());
        let sink = Arc::new(RecordingSink::new());
        let config = ClientConfig::default()
            .with_api_base_url("http://127.0.0.1:9")
            .with_request_timeout(std::time::Duration::from_secs(2));
        let gw = HttpGateway::new(config, creds, sink.clone()).unwrap();

        let result: ApiResult<serde_json::Value> =
            gw.get_json("/auth/me", OnUnauthorized::Redirect).await;

        let err = result.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
        assert!(err.is_transient());
        assert!(sink.effects().is_empty());
    }
}
