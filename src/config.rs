//! Client configuration.

use std::time::Duration;

use serde::Deserialize;

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "LUNCH_BUDDY_API_URL";

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Deep link scheme registered by the app.
pub const DEFAULT_LINK_SCHEME: &str = "lunchbuddy";

/// Default timeout for a single API request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the Lunch Buddy core.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use lunch_buddy_core::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_api_base_url("https://lunch.example.com/api/v1")
///     .with_request_timeout(Duration::from_secs(5));
/// assert_eq!(config.link_scheme, "lunchbuddy");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash.
    pub api_base_url: String,
    /// Timeout applied to every request.
    #[serde(with = "timeout_secs")]
    pub request_timeout: Duration,
    /// Scheme accepted for invite deep links.
    pub link_scheme: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            link_scheme: DEFAULT_LINK_SCHEME.to_string(),
        }
    }
}

impl ClientConfig {
    /// Builds the default configuration, honoring `LUNCH_BUDDY_API_URL`.
    #[must_use]
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => config.with_api_base_url(url.trim()),
            _ => config,
        }
    }

    /// Sets the API base URL. A trailing slash is stripped.
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.api_base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the accepted deep link scheme.
    #[must_use]
    pub fn with_link_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.link_scheme = scheme.into().to_ascii_lowercase();
        self
    }

    /// Joins a path onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}

mod timeout_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
