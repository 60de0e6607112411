//! # Bakery API Client
//!
//! A retrying, offline-aware client for the bakery ordering and fulfillment
//! REST API, used by the admin back-office and the branch stores.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`ClientConfig`] and [`ClientConfigBuilder`]
//! - A single request path, [`ApiClient`], with per-attempt timeouts
//! - One typed error per failure ([`ApiError`], [`ErrorCode`]) behind a
//!   unified [`HttpError`]
//! - Exponential backoff for transient failures
//! - Offline fail-fast plus a queue of requests deferred until connectivity
//!   returns
//! - Session persistence and clearing on authentication failure
//! - Hooks for login redirects, toasts and an "unauthorized" prompt
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use bakery_api::{ApiClient, BaseUrl, ClientConfig};
//!
//! let config = ClientConfig::builder()
//!     .base_url(BaseUrl::new("https://api.bakery.example/api").unwrap())
//!     .default_retry_delay(Duration::from_millis(500))
//!     .build()
//!     .unwrap();
//!
//! let client = ApiClient::new(config).unwrap();
//! assert_eq!(client.base_url().host_name(), "api.bakery.example");
//! ```
//!
//! ## Making API Requests
//!
//! ```rust,ignore
//! use bakery_api::{ApiClient, ClientConfig, Session};
//! use serde_json::json;
//!
//! let client = ApiClient::new(ClientConfig::from_env()?)?;
//! client.login(&Session::new(token, "branch", "Kemang"))?;
//!
//! let order: Order = client
//!     .post("/orders", &json!({"branch_id": 3, "items": [{"food_id": 1, "qty": 12}]}), None)
//!     .await?;
//! ```
//!
//! ## Wiring the UI
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bakery_api::{ApiClient, ClientConfig};
//! use bakery_api::auth::{AuthNotificationBridge, FileCredentialStore};
//!
//! let bridge = AuthNotificationBridge::new();
//! let client = ApiClient::builder(ClientConfig::from_env()?)
//!     .credential_store(Arc::new(FileCredentialStore::new("session.json")))
//!     .navigator(Arc::new(my_router))
//!     .toast_sink(Arc::new(my_toasts))
//!     .auth_bridge(bridge.clone())
//!     .build()?;
//!
//! // Held by the provider component while it is mounted
//! let _registration = bridge.register(|message| show_unauthorized_modal(message));
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: Configuration and collaborators are passed explicitly
//! - **Fail-fast validation**: Newtypes and builders validate on construction
//! - **Thread-safe**: All types are `Send + Sync`
//! - **Async-first**: Designed for use with the Tokio runtime

pub mod auth;
pub mod clients;
pub mod config;
pub mod error;

// Re-export public types at crate root for convenience
pub use auth::Session;
pub use config::{BaseUrl, ClientConfig, ClientConfigBuilder};
pub use error::{ConfigError, CredentialStoreError};

// Re-export client types
pub use clients::{
    ApiClient, ApiClientBuilder, ApiError, ConnectivityTracker, DecodeError, ErrorCode,
    HttpError, HttpMethod, InvalidRequestError, RequestBody, RequestOptions,
    RequestOptionsBuilder,
};
