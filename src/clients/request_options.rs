//! Per-call request configuration.
//!
//! This module provides [`RequestOptions`] and its builder. Options carry the
//! HTTP fields of a call (method, headers, query, body) together with the
//! knobs of the retry layer (timeout, retries, backoff, toast, auth).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};

use crate::clients::errors::{ApiError, InvalidRequestError};
use crate::clients::retry::RetryPolicy;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default base backoff delay.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_000);

/// Callback invoked before each retry with the 1-indexed retry number and
/// the error that triggered it.
pub type RetryCallback = Arc<dyn Fn(u32, &ApiError) + Send + Sync>;

/// HTTP methods used against the bakery API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HttpMethod {
    /// HTTP GET.
    #[default]
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP PATCH.
    Patch,
    /// HTTP DELETE.
    Delete,
}

impl HttpMethod {
    /// Converts to the transport's method type.
    #[must_use]
    pub const fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Patch => write!(f, "PATCH"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A request body.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// A JSON document, sent as `application/json`.
    Json(serde_json::Value),
    /// Pre-serialized text, sent as `application/json` unless the caller set
    /// a content type.
    Text(String),
    /// Opaque bytes (uploads, multipart payloads built by the caller).
    /// No content type is injected.
    Binary {
        /// The raw payload.
        bytes: Vec<u8>,
        /// Content type to send, if any.
        content_type: Option<String>,
    },
}

impl RequestBody {
    /// Returns `true` for payloads that must not get a JSON content type.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Binary { .. })
    }
}

/// Configuration for one logical call.
///
/// Use [`RequestOptions::builder`] to construct options. Headers and query
/// parameters not interpreted by the client are passed to the transport
/// untouched.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use bakery_api::clients::{HttpMethod, RequestOptions};
/// use serde_json::json;
///
/// let options = RequestOptions::builder()
///     .method(HttpMethod::Post)
///     .json(json!({"food_id": 1, "qty": 12}))
///     .max_retries(1)
///     .retry_delay(Duration::from_millis(200))
///     .show_toast(false)
///     .build()
///     .unwrap();
///
/// assert_eq!(options.max_retries, 1);
/// assert!(!options.show_toast);
/// ```
#[derive(Clone)]
pub struct RequestOptions {
    /// The HTTP method.
    pub method: HttpMethod,
    /// Extra headers to send.
    pub headers: HashMap<String, String>,
    /// Query parameters to append to the URL.
    pub query: Option<HashMap<String, String>>,
    /// The request body, if any.
    pub body: Option<RequestBody>,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base backoff delay.
    pub retry_delay: Duration,
    /// Whether a terminal failure should raise a toast.
    pub show_toast: bool,
    /// Whether to omit the stored bearer token.
    pub skip_auth: bool,
    /// Invoked before each retry.
    pub on_retry: Option<RetryCallback>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: HttpMethod::Get,
            headers: HashMap::new(),
            query: None,
            body: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            show_toast: true,
            skip_auth: false,
            on_retry: None,
        }
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("method", &self.method)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("query", &self.query)
            .field("body", &self.body.as_ref().map(|_| "<body>"))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("show_toast", &self.show_toast)
            .field("skip_auth", &self.skip_auth)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl RequestOptions {
    /// Creates a builder starting from the default options.
    #[must_use]
    pub fn builder() -> RequestOptionsBuilder {
        Self::default().into_builder()
    }

    /// The reduced profile for simple call sites: one attempt, no toast.
    ///
    /// Failures still go through classification and the auth side effects.
    #[must_use]
    pub fn legacy() -> Self {
        Self {
            max_retries: 0,
            show_toast: false,
            ..Self::default()
        }
    }

    /// Turns these options back into a builder.
    #[must_use]
    pub const fn into_builder(self) -> RequestOptionsBuilder {
        RequestOptionsBuilder { options: self }
    }

    /// Returns the backoff schedule for these options.
    #[must_use]
    pub const fn retry_policy(&self, max_backoff: Option<Duration>) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay).with_max_backoff(max_backoff)
    }

    /// Returns `true` if the caller set `name`, ignoring case.
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.keys().any(|key| key.eq_ignore_ascii_case(name))
    }

    /// Validates header names and values.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRequestError`] for the first header the transport
    /// would reject.
    pub fn verify(&self) -> Result<(), InvalidRequestError> {
        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| InvalidRequestError::InvalidHeaderName { name: name.clone() })?;
            HeaderValue::from_str(value)
                .map_err(|_| InvalidRequestError::InvalidHeaderValue { name: name.clone() })?;
        }
        Ok(())
    }
}

/// Builder for [`RequestOptions`].
#[derive(Debug)]
pub struct RequestOptionsBuilder {
    options: RequestOptions,
}

impl RequestOptionsBuilder {
    /// Sets the HTTP method.
    #[must_use]
    pub const fn method(mut self, method: HttpMethod) -> Self {
        self.options.method = method;
        self
    }

    /// Adds a single header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.insert(key.into(), value.into());
        self
    }

    /// Adds a single query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options
            .query
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn json(mut self, body: impl Into<serde_json::Value>) -> Self {
        self.options.body = Some(RequestBody::Json(body.into()));
        self
    }

    /// Sets a pre-serialized text body.
    #[must_use]
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.options.body = Some(RequestBody::Text(body.into()));
        self
    }

    /// Sets a binary body with an optional content type.
    #[must_use]
    pub fn binary(mut self, bytes: impl Into<Vec<u8>>, content_type: Option<String>) -> Self {
        self.options.body = Some(RequestBody::Binary {
            bytes: bytes.into(),
            content_type,
        });
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Sets the number of retries after the first attempt.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.options.max_retries = max_retries;
        self
    }

    /// Sets the base backoff delay.
    #[must_use]
    pub const fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.options.retry_delay = retry_delay;
        self
    }

    /// Sets whether a terminal failure raises a toast.
    #[must_use]
    pub const fn show_toast(mut self, show_toast: bool) -> Self {
        self.options.show_toast = show_toast;
        self
    }

    /// Sets whether to omit the stored bearer token.
    #[must_use]
    pub const fn skip_auth(mut self, skip_auth: bool) -> Self {
        self.options.skip_auth = skip_auth;
        self
    }

    /// Sets the retry callback.
    #[must_use]
    pub fn on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(u32, &ApiError) + Send + Sync + 'static,
    {
        self.options.on_retry = Some(Arc::new(callback));
        self
    }

    /// Builds the options, validating headers.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRequestError`] if a header is invalid.
    pub fn build(self) -> Result<RequestOptions, InvalidRequestError> {
        self.options.verify()?;
        Ok(self.options)
    }
}
