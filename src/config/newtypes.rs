//! Validated newtype wrappers for configuration values.

use crate::error::ConfigError;
use std::fmt;

/// Environment variable holding the API base URL.
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";

/// Base URL used when [`API_BASE_URL_ENV`] is unset or empty.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// A validated API base URL.
///
/// The URL must have an alphabetic scheme and a non-empty host. Trailing
/// slashes are trimmed so endpoints can be appended directly.
///
/// # Example
///
/// ```rust
/// use bakery_api::BaseUrl;
///
/// let url = BaseUrl::new("https://api.bakery.example/api/").unwrap();
/// assert_eq!(url.as_ref(), "https://api.bakery.example/api");
/// assert_eq!(url.scheme(), "https");
/// assert_eq!(url.host_name(), "api.bakery.example");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseUrl {
    url: String,
    scheme_end: usize,
    host_start: usize,
    host_end: usize,
}

impl BaseUrl {
    /// Creates a new validated base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the URL is invalid.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let url = url.trim().trim_end_matches('/').to_string();
        let invalid = || ConfigError::InvalidBaseUrl { url: url.clone() };

        let scheme_end = url.find("://").ok_or_else(invalid)?;
        let scheme = &url[..scheme_end];
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let host_start = scheme_end + 3;
        if host_start >= url.len() {
            return Err(invalid());
        }

        // Host ends at port, path, query, or end of string
        let host_end = url[host_start..]
            .find([':', '/', '?', '#'])
            .map_or(url.len(), |i| host_start + i);
        if host_end == host_start {
            return Err(invalid());
        }

        Ok(Self {
            url,
            scheme_end,
            host_start,
            host_end,
        })
    }

    /// Resolves the base URL from an optional environment value, falling
    /// back to [`DEFAULT_API_BASE_URL`] when unset or blank.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if a non-blank value is invalid.
    pub fn from_env_value(value: Option<&str>) -> Result<Self, ConfigError> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => Self::new(value),
            None => Self::new(DEFAULT_API_BASE_URL),
        }
    }

    /// Reads [`API_BASE_URL_ENV`] from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the variable is set to an
    /// invalid URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_value(std::env::var(API_BASE_URL_ENV).ok().as_deref())
    }

    /// Returns the URL scheme (e.g., "https").
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.url[..self.scheme_end]
    }

    /// Returns the host name portion of the URL.
    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.url[self.host_start..self.host_end]
    }

    /// Joins an endpoint onto the base URL, adding a leading `/` if missing.
    #[must_use]
    pub fn join(&self, endpoint: &str) -> String {
        if endpoint.is_empty() || endpoint.starts_with('/') {
            format!("{}{endpoint}", self.url)
        } else {
            format!("{}/{endpoint}", self.url)
        }
    }
}

impl Default for BaseUrl {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_BASE_URL.to_string(),
            scheme_end: 4,
            host_start: 7,
            host_end: 16,
        }
    }
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_rejects_missing_scheme() {
        assert!(matches!(
            BaseUrl::new("localhost:5000/api"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_base_url_rejects_empty_host() {
        assert!(BaseUrl::new("http://").is_err());
        assert!(BaseUrl::new("http:///api").is_err());
        assert!(BaseUrl::new("ht1p://host").is_err());
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let url = BaseUrl::new("  http://127.0.0.1:8080/api//  ").unwrap();
        assert_eq!(url.as_ref(), "http://127.0.0.1:8080/api");
        assert_eq!(url.host_name(), "127.0.0.1");
    }

    #[test]
    fn test_join_adds_missing_slash() {
        let url = BaseUrl::new("http://localhost:5000/api").unwrap();
        assert_eq!(url.join("/foods"), "http://localhost:5000/api/foods");
        assert_eq!(url.join("foods"), "http://localhost:5000/api/foods");
        assert_eq!(url.join(""), "http://localhost:5000/api");
    }

    #[test]
    fn test_from_env_value_falls_back_to_default() {
        assert_eq!(BaseUrl::from_env_value(None).unwrap().as_ref(), DEFAULT_API_BASE_URL);
        assert_eq!(
            BaseUrl::from_env_value(Some("   ")).unwrap().as_ref(),
            DEFAULT_API_BASE_URL
        );
        assert_eq!(
            BaseUrl::from_env_value(Some("https://orders.example")).unwrap().as_ref(),
            "https://orders.example"
        );
        assert!(BaseUrl::from_env_value(Some("garbage")).is_err());
    }

    #[test]
    fn test_default_matches_parsed_default() {
        assert_eq!(BaseUrl::default(), BaseUrl::new(DEFAULT_API_BASE_URL).unwrap());
        assert_eq!(BaseUrl::default().host_name(), "localhost");
    }
}
