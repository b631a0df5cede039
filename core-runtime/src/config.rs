//! # Client Configuration
//!
//! Construction input for a ClearML client: where the API lives, which
//! credentials to exchange for a session token, and how patient the transport
//! should be.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ClientConfig;
//!
//! let config = ClientConfig::builder()
//!     .api_url("https://api.clear.ml")
//!     .access_key("ACCESS")
//!     .secret_key("SECRET")
//!     .build()?;
//! ```
//!
//! or, reading `CLEARML_API_URL`, `CLEARML_ACCESS_KEY` and `CLEARML_SECRET_KEY`:
//!
//! ```ignore
//! let config = ClientConfig::from_env()?;
//! ```
//!
//! ## Validation
//!
//! The builder fails fast. Credentials must be non-empty. The API URL must
//! be an absolute `http`/`https` URL; whatever path, query or fragment it
//! carries is dropped so that endpoint paths always resolve from the root.

use crate::error::{Error, Result};
use crate::logging::redact_if_sensitive;
use bridge_traits::http::RetryPolicy;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Public ClearML endpoint used when no URL is configured
pub const DEFAULT_API_URL: &str = "https://api.clear.ml";

pub const ENV_API_URL: &str = "CLEARML_API_URL";
pub const ENV_ACCESS_KEY: &str = "CLEARML_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "CLEARML_SECRET_KEY";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Validated client configuration.
///
/// Use [`ClientConfig::builder`] or [`ClientConfig::from_env`] to construct.
#[derive(Clone)]
pub struct ClientConfig {
    api_url: Url,
    access_key: String,
    secret_key: String,
    user_agent: String,
    request_timeout: Duration,
    connect_timeout: Duration,
    retry_policy: RetryPolicy,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url.as_str())
            .field("access_key", &self.access_key)
            .field("secret_key", &redact_if_sensitive("secret_key", &self.secret_key))
            .field("user_agent", &self.user_agent)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Build from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    ///
    /// Empty variables count as unset. The URL falls back to
    /// [`DEFAULT_API_URL`]; the keys have no fallback.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut builder = Self::builder()
            .api_url(read(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string()));

        if let Some(access_key) = read(ENV_ACCESS_KEY) {
            builder = builder.access_key(access_key);
        }
        if let Some(secret_key) = read(ENV_SECRET_KEY) {
            builder = builder.secret_key(secret_key);
        }

        builder.build()
    }

    /// API root; path is always `/`
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }
}

/// Builder for [`ClientConfig`]
#[derive(Default)]
pub struct ClientConfigBuilder {
    api_url: Option<String>,
    access_key: Option<String>,
    secret_key: Option<String>,
    user_agent: Option<String>,
    request_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
}

impl ClientConfigBuilder {
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn access_key(mut self, key: impl Into<String>) -> Self {
        self.access_key = Some(key.into());
        self
    }

    pub fn secret_key(mut self, key: impl Into<String>) -> Self {
        self.secret_key = Some(key.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingSetting`] when a key is absent or blank
    /// - [`Error::Config`] when the URL is not an absolute http(s) URL or a
    ///   timeout is zero
    pub fn build(self) -> Result<ClientConfig> {
        let api_url = normalize_api_url(self.api_url.as_deref().unwrap_or(DEFAULT_API_URL))?;

        let access_key = required("access_key", ENV_ACCESS_KEY, self.access_key)?;
        let secret_key = required("secret_key", ENV_SECRET_KEY, self.secret_key)?;

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let connect_timeout = self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        if request_timeout.is_zero() || connect_timeout.is_zero() {
            return Err(Error::Config("Timeouts must be greater than zero".to_string()));
        }

        Ok(ClientConfig {
            api_url,
            access_key,
            secret_key,
            user_agent: self
                .user_agent
                .filter(|ua| !ua.trim().is_empty())
                .unwrap_or_else(default_user_agent),
            request_timeout,
            connect_timeout,
            retry_policy: self.retry_policy.unwrap_or_default(),
        })
    }
}

pub fn default_user_agent() -> String {
    concat!("clearml-sync/", env!("CARGO_PKG_VERSION")).to_string()
}

fn required(setting: &str, env_var: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::MissingSetting {
            setting: setting.to_string(),
            message: format!("must be non-empty (set it explicitly or via {})", env_var),
        }),
    }
}

/// Parse an absolute http(s) URL and reset it to the API root.
pub fn normalize_api_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::Config("API URL must not be empty".to_string()));
    }

    let mut url = Url::parse(raw)
        .map_err(|e| Error::Config(format!("Invalid API URL '{}': {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::Config(format!(
            "API URL '{}' must be an absolute http(s) URL",
            raw
        )));
    }

    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
