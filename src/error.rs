//! Error types for client setup and credential storage.
//!
//! Request failures are reported as [`HttpError`](crate::HttpError). This module holds the
//! errors that happen around requests: building the configuration and
//! reading or writing the stored session.
//!
//! # Example
//!
//! ```rust
//! use bakery_api::{BaseUrl, ConfigError};
//!
//! let result = BaseUrl::new("localhost:5000");
//! assert!(matches!(result, Err(ConfigError::InvalidBaseUrl { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur while configuring the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Base URL is invalid.
    #[error("Invalid API base URL '{url}'. Expected a URL with scheme and host (e.g., 'https://api.example.com/api').")]
    InvalidBaseUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// Login path cannot be empty.
    #[error("Login path cannot be empty. Provide the path of the login screen (e.g., '/login').")]
    EmptyLoginPath,

    /// The underlying HTTP client could not be created.
    #[error("Failed to build HTTP client: {reason}")]
    HttpClientBuild {
        /// The transport's error message.
        reason: String,
    },
}

/// Errors from reading or writing the stored session.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// The backing storage could not be accessed.
    #[error("Credential storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stored record could not be encoded or decoded.
    #[error("Stored session is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}
