//! Configuration types for the bakery API client.
//!
//! # Overview
//!
//! - [`ClientConfig`]: Settings shared by every request a client makes
//! - [`ClientConfigBuilder`]: A builder for constructing [`ClientConfig`] instances
//! - [`BaseUrl`]: A validated API base URL
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use bakery_api::{BaseUrl, ClientConfig};
//!
//! let config = ClientConfig::builder()
//!     .base_url(BaseUrl::new("https://api.bakery.example/api").unwrap())
//!     .login_path("/auth/login")
//!     .max_backoff(Duration::from_secs(10))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.login_path(), "/auth/login");
//! ```

mod newtypes;

pub use newtypes::{BaseUrl, API_BASE_URL_ENV, DEFAULT_API_BASE_URL};

use std::time::Duration;

use crate::clients::{RequestOptions, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT};
use crate::error::ConfigError;

/// Default path of the login screen.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Configuration for an [`ApiClient`](crate::ApiClient).
///
/// # Thread Safety
///
/// `ClientConfig` is `Clone`, `Send`, and `Sync`.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    base_url: BaseUrl,
    login_path: String,
    user_agent_prefix: Option<String>,
    initially_online: bool,
    max_backoff: Option<Duration>,
    default_timeout: Duration,
    default_max_retries: u32,
    default_retry_delay: Duration,
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Builds a configuration from the process environment.
    ///
    /// Only the base URL is read (from [`API_BASE_URL_ENV`]); everything else
    /// takes its default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the variable holds an
    /// invalid URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().base_url(BaseUrl::from_env()?).build()
    }

    /// Returns the API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the login screen path used for auth redirects.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns the connectivity state assumed at startup.
    #[must_use]
    pub const fn initially_online(&self) -> bool {
        self.initially_online
    }

    /// Returns the cap on a single backoff delay, if any.
    #[must_use]
    pub const fn max_backoff(&self) -> Option<Duration> {
        self.max_backoff
    }

    /// Returns request options seeded with this configuration's defaults.
    #[must_use]
    pub fn default_request_options(&self) -> RequestOptions {
        RequestOptions {
            timeout: self.default_timeout,
            max_retries: self.default_max_retries,
            retry_delay: self.default_retry_delay,
            ..RequestOptions::default()
        }
    }
}

// Verify ClientConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientConfig>();
};

/// Builder for constructing [`ClientConfig`] instances.
///
/// # Defaults
///
/// - `base_url`: [`DEFAULT_API_BASE_URL`]
/// - `login_path`: `/login`
/// - `user_agent_prefix`: `None`
/// - `initially_online`: `true`
/// - `max_backoff`: `None` (uncapped)
/// - `default_timeout`: 30 seconds
/// - `default_max_retries`: 2
/// - `default_retry_delay`: 1 second
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<BaseUrl>,
    login_path: Option<String>,
    user_agent_prefix: Option<String>,
    initially_online: Option<bool>,
    max_backoff: Option<Duration>,
    default_timeout: Option<Duration>,
    default_max_retries: Option<u32>,
    default_retry_delay: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: BaseUrl) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Sets the login screen path.
    #[must_use]
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = Some(path.into());
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets the platform's online indicator at startup.
    #[must_use]
    pub const fn initially_online(mut self, online: bool) -> Self {
        self.initially_online = Some(online);
        self
    }

    /// Caps every individual backoff delay.
    #[must_use]
    pub const fn max_backoff(mut self, cap: Duration) -> Self {
        self.max_backoff = Some(cap);
        self
    }

    /// Sets the default per-attempt timeout.
    #[must_use]
    pub const fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Sets the default number of retries.
    #[must_use]
    pub const fn default_max_retries(mut self, retries: u32) -> Self {
        self.default_max_retries = Some(retries);
        self
    }

    /// Sets the default base backoff delay.
    #[must_use]
    pub const fn default_retry_delay(mut self, delay: Duration) -> Self {
        self.default_retry_delay = Some(delay);
        self
    }

    /// Builds the [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyLoginPath`] if the login path is blank.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let login_path = self
            .login_path
            .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());
        if login_path.trim().is_empty() {
            return Err(ConfigError::EmptyLoginPath);
        }

        Ok(ClientConfig {
            base_url: self.base_url.unwrap_or_default(),
            login_path,
            user_agent_prefix: self.user_agent_prefix,
            initially_online: self.initially_online.unwrap_or(true),
            max_backoff: self.max_backoff,
            default_timeout: self.default_timeout.unwrap_or(DEFAULT_TIMEOUT),
            default_max_retries: self.default_max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            default_retry_delay: self.default_retry_delay.unwrap_or(DEFAULT_RETRY_DELAY),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_provides_sensible_defaults() {
        let config = ClientConfig::builder().build().unwrap();

        assert_eq!(config.base_url().as_ref(), DEFAULT_API_BASE_URL);
        assert_eq!(config.login_path(), "/login");
        assert!(config.user_agent_prefix().is_none());
        assert!(config.initially_online());
        assert!(config.max_backoff().is_none());

        let options = config.default_request_options();
        assert_eq!(options.timeout, DEFAULT_TIMEOUT);
        assert_eq!(options.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(options.retry_delay, DEFAULT_RETRY_DELAY);
    }

    #[test]
    fn test_builder_rejects_blank_login_path() {
        let result = ClientConfig::builder().login_path("  ").build();
        assert!(matches!(result, Err(ConfigError::EmptyLoginPath)));
    }

    #[test]
    fn test_builder_with_all_optional_fields() {
        let config = ClientConfig::builder()
            .base_url(BaseUrl::new("https://api.bakery.example").unwrap())
            .login_path("/signin")
            .user_agent_prefix("BranchPOS/2.1")
            .initially_online(false)
            .max_backoff(Duration::from_secs(8))
            .default_timeout(Duration::from_secs(5))
            .default_max_retries(4)
            .default_retry_delay(Duration::from_millis(100))
            .build()
            .unwrap();

        assert_eq!(config.base_url().host_name(), "api.bakery.example");
        assert_eq!(config.login_path(), "/signin");
        assert_eq!(config.user_agent_prefix(), Some("BranchPOS/2.1"));
        assert!(!config.initially_online());
        assert_eq!(config.max_backoff(), Some(Duration::from_secs(8)));

        let options = config.default_request_options();
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.max_retries, 4);
        assert_eq!(options.retry_delay, Duration::from_millis(100));
        assert!(options.show_toast);
    }

    #[test]
    fn test_config_is_clone_and_debug() {
        let config = ClientConfig::builder().build().unwrap();
        let cloned = config.clone();
        assert_eq!(cloned.base_url(), config.base_url());
        assert!(format!("{config:?}").contains("ClientConfig"));
    }
}
