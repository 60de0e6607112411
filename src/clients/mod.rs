//! The request pipeline to the bakery API.
//!
//! This module provides the client layer every screen of the back-office and
//! the branch stores go through. It gates calls on connectivity, parses and
//! normalizes responses, classifies failures, retries transient ones and
//! reacts to terminal ones.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`ApiClient`]: The async client for API communication
//! - [`RequestOptions`]: Per-call method, headers, body and retry settings
//! - [`HttpError`]: The single error type every call returns
//! - [`ErrorCode`]: The closed taxonomy of failure kinds
//! - [`ConnectivityTracker`]: Online state and the offline request queue
//! - [`RetryPolicy`]: The exponential backoff schedule
//! - [`Envelope`]: The decoded `{success, data, error}` response wrapper
//! - [`Navigator`] and [`ToastSink`]: Hooks into the embedding UI
//!
//! # Example
//!
//! ```rust,ignore
//! use bakery_api::{ApiClient, ClientConfig, ErrorCode};
//!
//! let client = ApiClient::new(ClientConfig::from_env()?)?;
//!
//! let options = client.options().max_retries(3).build()?;
//! match client.request_value("/branches", options).await {
//!     Ok(branches) => println!("{branches}"),
//!     Err(e) if e.code() == ErrorCode::OfflineError => println!("offline"),
//!     Err(e) => println!("{}", e.message()),
//! }
//! ```
//!
//! # Retry Behavior
//!
//! - **Retryable** (`RATE_LIMIT_ERROR`, `SERVER_ERROR`, `TIMEOUT_ERROR`,
//!   `NETWORK_ERROR`): retried up to `max_retries` times, waiting
//!   `retry_delay * 2^n` after failed attempt `n`
//! - **Offline**: fails at once without a network attempt
//! - **Everything else**: returned after the first attempt
//!
//! The default is 2 retries with a 1 second base delay. Use
//! [`RequestOptions::legacy`] for a single attempt without toasts.

mod api_client;
pub mod classifier;
mod connectivity;
mod errors;
mod http_response;
mod request_options;
mod retry;
mod side_effects;

pub use api_client::{ApiClient, ApiClientBuilder, SDK_VERSION};
pub use connectivity::{ConnectivityTracker, QueueOutcome};
pub use errors::{
    ApiError, DecodeError, ErrorCode, HttpError, InvalidRequestError, UnknownErrorCode,
};
pub use http_response::{
    is_json_content_type, Envelope, EnvelopeError, HttpResponse, ParsedBody,
};
pub use request_options::{
    HttpMethod, RequestBody, RequestOptions, RequestOptionsBuilder, RetryCallback,
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT,
};
pub use retry::RetryPolicy;
pub use side_effects::{
    LogToastSink, Navigator, NoopNavigator, SideEffectDispatcher, Toast, ToastSink,
};
