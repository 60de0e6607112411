//! Error types for API requests.
//!
//! Every failed request is normalized into a single [`HttpError`] at the
//! client boundary. The common case is [`HttpError::Api`], which wraps an
//! [`ApiError`] carrying one [`ErrorCode`] and a retryability flag.
//!
//! # Error Handling
//!
//! - [`ErrorCode`]: The closed taxonomy of failure kinds
//! - [`ApiError`]: A classified failure with a user-facing message
//! - [`DecodeError`]: A response body that could not be parsed
//! - [`InvalidRequestError`]: A request that could not be built
//! - [`HttpError`]: Unified error type encompassing all of the above
//!
//! # Example
//!
//! ```rust,ignore
//! use bakery_api::{ErrorCode, HttpError};
//!
//! match client.get::<Vec<Food>>("/foods", None).await {
//!     Ok(foods) => println!("{} products", foods.len()),
//!     Err(e) if e.code() == ErrorCode::OfflineError => {
//!         println!("Offline, try again when connected");
//!     }
//!     Err(e) => println!("{}", e.message()),
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind of failure a request ended with.
///
/// This is a closed set: every failure maps to exactly one code. The wire
/// form (used by [`fmt::Display`], [`FromStr`] and serde) is the
/// `SCREAMING_SNAKE_CASE` name, e.g. `RATE_LIMIT_ERROR`.
///
/// # Example
///
/// ```rust
/// use bakery_api::ErrorCode;
///
/// assert!(ErrorCode::ServerError.is_retryable());
/// assert!(!ErrorCode::ValidationError.is_retryable());
/// assert_eq!(ErrorCode::RateLimitError.to_string(), "RATE_LIMIT_ERROR");
/// assert_eq!("OFFLINE_ERROR".parse::<ErrorCode>(), Ok(ErrorCode::OfflineError));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request never got a response (connection refused, DNS, reset).
    NetworkError,
    /// No response arrived before the per-attempt timeout fired.
    TimeoutError,
    /// The backend rejected the submitted data (HTTP 400).
    ValidationError,
    /// The session is missing or expired (HTTP 401).
    AuthenticationError,
    /// The session is valid but not allowed to do this (HTTP 403).
    AuthorizationError,
    /// The backend failed (HTTP 500/502/503/504).
    ServerError,
    /// Too many requests (HTTP 429).
    RateLimitError,
    /// Connectivity was down when the request was issued.
    OfflineError,
    /// Anything else.
    UnknownError,
}

impl ErrorCode {
    /// All codes, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::NetworkError,
        Self::TimeoutError,
        Self::ValidationError,
        Self::AuthenticationError,
        Self::AuthorizationError,
        Self::ServerError,
        Self::RateLimitError,
        Self::OfflineError,
        Self::UnknownError,
    ];

    /// Returns `true` if failures with this code may be retried automatically.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::RateLimitError
                | Self::ServerError
                | Self::TimeoutError
                | Self::NetworkError
                | Self::OfflineError
        )
    }

    /// Returns the wire name of this code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NetworkError => "NETWORK_ERROR",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::AuthenticationError => "AUTHENTICATION_ERROR",
            Self::AuthorizationError => "AUTHORIZATION_ERROR",
            Self::ServerError => "SERVER_ERROR",
            Self::RateLimitError => "RATE_LIMIT_ERROR",
            Self::OfflineError => "OFFLINE_ERROR",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Returns the user-facing message used when the backend supplies none.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::NetworkError => "Unable to reach the server. Check your connection.",
            Self::TimeoutError => "The request timed out. Please try again.",
            Self::ValidationError => "The submitted data is invalid.",
            Self::AuthenticationError => "Your session has expired. Please log in again.",
            Self::AuthorizationError => "You are not permitted to perform this action.",
            Self::ServerError => "The server is having trouble. Please try again later.",
            Self::RateLimitError => "Too many requests. Please try again later.",
            Self::OfflineError => "You are offline. Check your internet connection.",
            Self::UnknownError => "Server error.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized [`ErrorCode`] name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown error code '{0}'.")]
pub struct UnknownErrorCode(pub String);

impl FromStr for ErrorCode {
    type Err = UnknownErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownErrorCode(s.to_string()))
    }
}

/// A classified request failure.
///
/// Immutable once constructed. The `retryable` flag is always derived from
/// the code, so a rate-limited error is retryable even when no retries were
/// configured for the call.
///
/// The status predicates ([`is_unauthorized`](Self::is_unauthorized) and
/// friends) look only at the HTTP status, never at the code.
///
/// # Example
///
/// ```rust
/// use bakery_api::{ApiError, ErrorCode};
///
/// let error = ApiError::new(ErrorCode::ServerError, "Oven on fire").with_status(503);
///
/// assert!(error.retryable());
/// assert!(error.is_server_error());
/// assert_eq!(error.to_string(), "Oven on fire");
/// ```
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    code: ErrorCode,
    status_code: Option<u16>,
    details: Option<serde_json::Value>,
    retryable: bool,
}

impl ApiError {
    /// Creates an error with the given code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            status_code: None,
            details: None,
            retryable: code.is_retryable(),
        }
    }

    /// Creates an error with the code's default message.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// The error raised when connectivity is down at call time.
    #[must_use]
    pub fn offline() -> Self {
        Self::from_code(ErrorCode::OfflineError)
    }

    /// Attaches the HTTP status the error was derived from.
    #[must_use]
    pub const fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Attaches opaque server-supplied details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// The user-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The failure kind.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// The HTTP status, if the failure came from a response.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Server-supplied details, if any.
    #[must_use]
    pub const fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }

    /// Whether the request may be retried.
    #[must_use]
    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    /// Returns `true` for HTTP 401.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.status_code, Some(401))
    }

    /// Returns `true` for HTTP 403.
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self.status_code, Some(403))
    }

    /// Returns `true` for any 5xx status.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self.status_code, Some(code) if code >= 500)
    }

    /// Returns `true` for any 4xx status.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self.status_code, Some(code) if code >= 400 && code < 500)
    }
}

/// Error returned when a response body cannot be decoded.
///
/// A parse failure on an otherwise successful response is a defect and is
/// reported rather than turned into an empty result.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body declared JSON but was not valid JSON.
    #[error("Response from {endpoint} is not valid JSON: {source}")]
    InvalidJson {
        /// The endpoint that produced the body.
        endpoint: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The body carried a `success` field that is not a boolean.
    #[error("Response from {endpoint} has a malformed envelope: {reason}")]
    MalformedEnvelope {
        /// The endpoint that produced the body.
        endpoint: String,
        /// What was wrong with the envelope.
        reason: String,
    },

    /// The normalized payload does not match the type the caller asked for.
    #[error("Response from {endpoint} does not match the expected shape: {source}")]
    UnexpectedShape {
        /// The endpoint that produced the body.
        endpoint: String,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Error returned when a request cannot be built.
///
/// These are reported before any network attempt and are never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidRequestError {
    /// A header name is not a valid HTTP header name.
    #[error("Invalid header name '{name}'.")]
    InvalidHeaderName {
        /// The rejected name.
        name: String,
    },

    /// A header value is not a valid HTTP header value.
    #[error("Invalid value for header '{name}'.")]
    InvalidHeaderValue {
        /// The header whose value was rejected.
        name: String,
    },

    /// The request body could not be serialized to JSON.
    #[error("Cannot serialize request body: {reason}")]
    Serialization {
        /// The serializer's message.
        reason: String,
    },

    /// The endpoint produced a URL the transport rejected.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The endpoint as given by the caller.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Unified error type for all request failures.
///
/// # Example
///
/// ```rust,ignore
/// use bakery_api::HttpError;
///
/// match client.request_value("/orders", options).await {
///     Ok(value) => { /* handle success */ }
///     Err(HttpError::Api(e)) => { /* classified failure, see e.code() */ }
///     Err(HttpError::Decode(e)) => { /* backend sent something unparseable */ }
///     Err(HttpError::InvalidRequest(e)) => { /* caller bug */ }
/// }
/// ```
#[derive(Debug, Error)]
pub enum HttpError {
    /// A classified failure.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The response body could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The request could not be built.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequestError),
}

impl HttpError {
    /// The failure kind. Decode and build failures report
    /// [`ErrorCode::UnknownError`].
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Api(e) => e.code(),
            Self::Decode(_) | Self::InvalidRequest(_) => ErrorCode::UnknownError,
        }
    }

    /// A message suitable for showing to the user.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Api(e) => e.message().to_string(),
            Self::Decode(_) | Self::InvalidRequest(_) => {
                ErrorCode::UnknownError.default_message().to_string()
            }
        }
    }

    /// Whether the failure was eligible for automatic retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Api(e) => e.retryable(),
            Self::Decode(_) | Self::InvalidRequest(_) => false,
        }
    }

    /// Returns the classified error, if this is one.
    #[must_use]
    pub const fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            Self::Decode(_) | Self::InvalidRequest(_) => None,
        }
    }
}

// Errors cross task boundaries when requests are queued while offline
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpError>();
};
