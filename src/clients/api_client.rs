//! The bakery API client.
//!
//! This module provides [`ApiClient`], the single request path to the
//! backend. Every call goes through the same pipeline:
//!
//! 1. connectivity gate (offline fails fast with `OFFLINE_ERROR`)
//! 2. one attempt: header assembly, per-attempt timeout, body parsing
//! 3. normalization of the optional `{success, data, error}` envelope
//! 4. classification of failures into an [`ApiError`]
//! 5. exponential backoff for retryable failures
//! 6. side effects (credential clearing, login redirect, toast) once the
//!    call has failed for good

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::auth::{AuthNotificationBridge, CredentialStore, MemoryCredentialStore, Session};
use crate::clients::classifier::{classify_envelope, classify_response, classify_transport};
use crate::clients::connectivity::ConnectivityTracker;
use crate::clients::errors::{
    ApiError, DecodeError, ErrorCode, HttpError, InvalidRequestError,
};
use crate::clients::http_response::{Envelope, HttpResponse, ParsedBody};
use crate::clients::request_options::{
    HttpMethod, RequestBody, RequestOptions, RequestOptionsBuilder,
};
use crate::clients::side_effects::{
    LogToastSink, Navigator, NoopNavigator, SideEffectDispatcher, ToastSink,
};
use crate::config::{BaseUrl, ClientConfig};
use crate::error::{ConfigError, CredentialStoreError};

/// Library version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

const JSON_CONTENT_TYPE: &str = "application/json";

/// Client for the bakery REST API.
///
/// The client handles:
/// - URL construction from the configured [`BaseUrl`]
/// - Default headers (`User-Agent`, `Accept`) and bearer token injection
/// - Offline fail-fast and the offline request queue
/// - Classification of every failure into one [`ErrorCode`]
/// - Exponential backoff for retryable failures
/// - Credential clearing, login redirect and toasts on failure
///
/// # Thread Safety
///
/// `ApiClient` is `Clone`, `Send`, and `Sync`. Clones share the same
/// connection pool, credential store and connectivity tracker.
///
/// # Example
///
/// ```rust,no_run
/// use bakery_api::{ApiClient, ClientConfig};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Food {
///     food_id: u64,
///     name: String,
/// }
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::new(ClientConfig::from_env()?)?;
/// let foods: Vec<Food> = client.get("/foods", None).await?;
/// println!("{} products on the menu", foods.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    config: ClientConfig,
    default_headers: HashMap<String, String>,
    store: Arc<dyn CredentialStore>,
    connectivity: Arc<ConnectivityTracker>,
    bridge: AuthNotificationBridge,
    dispatcher: SideEffectDispatcher,
}

// Verify ApiClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ApiClient>();
};

impl ApiClient {
    /// Creates a client with in-memory credentials and headless
    /// collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if the HTTP transport cannot
    /// be initialized.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    /// Creates a builder for wiring in the UI's collaborators.
    #[must_use]
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder::new(config)
    }

    /// Returns the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &BaseUrl {
        self.inner.config.base_url()
    }

    /// Returns the configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the headers sent with every request.
    #[must_use]
    pub fn default_headers(&self) -> &HashMap<String, String> {
        &self.inner.default_headers
    }

    /// Returns the connectivity tracker shared with the application.
    #[must_use]
    pub fn connectivity(&self) -> &Arc<ConnectivityTracker> {
        &self.inner.connectivity
    }

    /// Returns the bridge notified on authentication failures.
    #[must_use]
    pub fn auth_bridge(&self) -> &AuthNotificationBridge {
        &self.inner.bridge
    }

    /// Returns the credential store.
    #[must_use]
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    /// Returns an options builder seeded with this client's defaults.
    #[must_use]
    pub fn options(&self) -> RequestOptionsBuilder {
        self.inner.config.default_request_options().into_builder()
    }

    /// Persists `session`; later requests carry its token.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] if the store cannot be written.
    pub fn login(&self, session: &Session) -> Result<(), CredentialStoreError> {
        self.inner.store.save(session)?;
        tracing::debug!(role = %session.role, "Stored session");
        Ok(())
    }

    /// Clears the stored session.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] if the store cannot be cleared.
    pub fn logout(&self) -> Result<(), CredentialStoreError> {
        self.inner.store.clear()
    }

    /// Performs one logical call and decodes the normalized payload as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Api`] for classified failures,
    /// [`HttpError::Decode`] if the body cannot be parsed or does not match
    /// `T`, and [`HttpError::InvalidRequest`] if the request cannot be built.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let options = client
    ///     .options()
    ///     .method(HttpMethod::Patch)
    ///     .json(json!({"status": "delivered"}))
    ///     .max_retries(0)
    ///     .build()?;
    ///
    /// let order: Order = client.request("/orders/42/status", options).await?;
    /// ```
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, HttpError> {
        let result = self
            .run(endpoint, &options)
            .await
            .and_then(|value| decode_as(endpoint, value));

        if let Err(error) = &result {
            self.inner
                .dispatcher
                .handle_terminal_failure(error, options.show_toast);
        }
        result
    }

    /// Performs one logical call and returns the normalized payload as JSON.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn request_value(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Value, HttpError> {
        self.request(endpoint, options).await
    }

    /// Sends a GET request. `options` defaults to this client's defaults.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: Option<RequestOptions>,
    ) -> Result<T, HttpError> {
        let options = RequestOptions {
            method: HttpMethod::Get,
            ..self.options_or_default(options)
        };
        self.request(endpoint, options).await
    }

    /// Sends a POST request with `body` serialized as JSON.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn post<T, B>(
        &self,
        endpoint: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(HttpMethod::Post, endpoint, body, options).await
    }

    /// Sends a PUT request with `body` serialized as JSON.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn put<T, B>(
        &self,
        endpoint: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(HttpMethod::Put, endpoint, body, options).await
    }

    /// Sends a PATCH request with `body` serialized as JSON.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn patch<T, B>(
        &self,
        endpoint: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(HttpMethod::Patch, endpoint, body, options).await
    }

    /// Sends a DELETE request.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: Option<RequestOptions>,
    ) -> Result<T, HttpError> {
        let options = RequestOptions {
            method: HttpMethod::Delete,
            ..self.options_or_default(options)
        };
        self.request(endpoint, options).await
    }

    /// Defers a call until connectivity is available.
    ///
    /// Online, the call starts immediately on the current runtime. Offline,
    /// it waits in the connectivity tracker's queue and runs when the
    /// application reports connectivity again. The receiver yields the
    /// call's result; it is closed without a value if the queue is dropped
    /// before the call runs.
    pub fn request_when_online<T>(
        &self,
        endpoint: impl Into<String>,
        options: RequestOptions,
    ) -> oneshot::Receiver<Result<T, HttpError>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let client = self.clone();
        let endpoint = endpoint.into();

        let outcome = self.inner.connectivity.enqueue(move || async move {
            let result = client.request::<T>(&endpoint, options).await;
            // The caller may have stopped listening
            let _ = tx.send(result);
        });
        tracing::debug!(?outcome, "Deferred request handed to connectivity tracker");
        rx
    }

    fn options_or_default(&self, options: Option<RequestOptions>) -> RequestOptions {
        options.unwrap_or_else(|| self.inner.config.default_request_options())
    }

    async fn send_json<T, B>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let options = self.options_or_default(options);
        let body = match serde_json::to_value(body) {
            Ok(body) => body,
            Err(e) => {
                let error = HttpError::from(InvalidRequestError::Serialization {
                    reason: e.to_string(),
                });
                self.inner
                    .dispatcher
                    .handle_terminal_failure(&error, options.show_toast);
                return Err(error);
            }
        };

        let options = RequestOptions {
            method,
            body: Some(RequestBody::Json(body)),
            ..options
        };
        self.request(endpoint, options).await
    }

    /// The retry loop. Returns the normalized payload or the final error.
    async fn run(&self, endpoint: &str, options: &RequestOptions) -> Result<Value, HttpError> {
        options.verify()?;
        let url = self.resolve_url(endpoint)?;
        let policy = options.retry_policy(self.inner.config.max_backoff());

        let mut attempt: u32 = 0;
        loop {
            if !self.inner.connectivity.is_online() {
                tracing::debug!(endpoint, attempt, "Offline; request not sent");
                return Err(ApiError::offline().into());
            }

            let error = match self.execute_once(endpoint, &url, options).await {
                Ok(value) => return Ok(value),
                Err(HttpError::Api(error)) => error,
                Err(other) => return Err(other),
            };

            if error.code() == ErrorCode::AuthenticationError {
                self.inner.dispatcher.handle_auth_failure(&error);
            }

            let Some(delay) = policy.next_delay(attempt, &error) else {
                return Err(error.into());
            };
            attempt += 1;

            tracing::warn!(
                endpoint,
                code = %error.code(),
                retry = attempt,
                max_retries = options.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Retrying request"
            );
            if let Some(on_retry) = &options.on_retry {
                on_retry(attempt, &error);
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Performs exactly one network attempt.
    async fn execute_once(
        &self,
        endpoint: &str,
        url: &reqwest::Url,
        options: &RequestOptions,
    ) -> Result<Value, HttpError> {
        let headers = self.build_headers(options)?;

        let mut req_builder = self
            .inner
            .http
            .request(options.method.as_reqwest(), url.clone())
            .headers(headers)
            .timeout(options.timeout);

        if let Some(query) = &options.query {
            req_builder = req_builder.query(query);
        }

        req_builder = match &options.body {
            Some(RequestBody::Json(value)) => req_builder.body(value.to_string()),
            Some(RequestBody::Text(text)) => req_builder.body(text.clone()),
            Some(RequestBody::Binary { bytes, .. }) => req_builder.body(bytes.clone()),
            None => req_builder,
        };

        tracing::debug!(method = %options.method, endpoint, "Sending request");
        let res = req_builder
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let code = res.status().as_u16();
        let res_headers = parse_response_headers(res.headers());
        let body_text = res.text().await.map_err(|e| classify_transport(&e))?;

        let response = Self::parse_response(endpoint, code, res_headers, body_text)?;
        if let Some(request_id) = response.request_id() {
            tracing::debug!(endpoint, code, request_id, "Received response");
        } else {
            tracing::debug!(endpoint, code, "Received response");
        }
        Self::normalize(endpoint, response)
    }

    /// Assembles the headers for one attempt.
    ///
    /// Later layers override earlier ones: defaults, then the stored bearer
    /// token, then the JSON content type, then the caller's own headers.
    fn build_headers(&self, options: &RequestOptions) -> Result<HeaderMap, InvalidRequestError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.inner.default_headers {
            insert_header(&mut headers, name, value)?;
        }

        if !options.skip_auth && !options.has_header(AUTHORIZATION.as_str()) {
            if let Some(token) = self.stored_token() {
                insert_header(&mut headers, AUTHORIZATION.as_str(), &format!("Bearer {token}"))?;
            }
        }

        if !options.has_header(CONTENT_TYPE.as_str()) {
            let content_type = match &options.body {
                Some(RequestBody::Binary { content_type, .. }) => content_type.as_deref(),
                _ => Some(JSON_CONTENT_TYPE),
            };
            if let Some(content_type) = content_type {
                insert_header(&mut headers, CONTENT_TYPE.as_str(), content_type)?;
            }
        }

        for (name, value) in &options.headers {
            insert_header(&mut headers, name, value)?;
        }
        Ok(headers)
    }

    fn stored_token(&self) -> Option<String> {
        match self.inner.store.load() {
            Ok(session) => session.filter(Session::is_active).map(|s| s.token),
            Err(e) => {
                tracing::warn!("Failed to read stored session; sending without token: {}", e);
                None
            }
        }
    }

    fn resolve_url(&self, endpoint: &str) -> Result<reqwest::Url, InvalidRequestError> {
        let url = self.inner.config.base_url().join(endpoint);
        reqwest::Url::parse(&url).map_err(|e| InvalidRequestError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    /// Parses the body according to its content type.
    ///
    /// Invalid JSON on a failed response is dropped so the status can still
    /// be classified; on a successful response it is a decode error.
    fn parse_response(
        endpoint: &str,
        code: u16,
        headers: HashMap<String, Vec<String>>,
        body_text: String,
    ) -> Result<HttpResponse, DecodeError> {
        let content_type = headers
            .get("content-type")
            .and_then(|values| values.first())
            .map(String::as_str);

        let body = match ParsedBody::parse(endpoint, content_type, body_text) {
            Ok(body) => body,
            Err(e) if !(200..300).contains(&code) => {
                tracing::debug!(endpoint, code, "Ignoring unparseable error body: {}", e);
                ParsedBody::Json(Value::Null)
            }
            Err(e) => return Err(e),
        };
        Ok(HttpResponse::new(code, headers, body))
    }

    /// Unwraps the envelope of a response or classifies it as a failure.
    fn normalize(endpoint: &str, response: HttpResponse) -> Result<Value, HttpError> {
        if !response.is_ok() {
            let body = response.body.into_value();
            return Err(classify_response(response.code, &body).into());
        }

        let value = match response.body {
            ParsedBody::Text(text) => return Ok(Value::String(text)),
            ParsedBody::Json(value) => value,
        };
        match Envelope::decode(endpoint, value)? {
            Envelope::Bare(data) | Envelope::Success(data) => Ok(data),
            Envelope::Failure(error) => {
                tracing::debug!(endpoint, "Response carried success: false");
                Err(classify_envelope(response.code, &error).into())
            }
        }
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", self.base_url())
            .field("connectivity", &self.inner.connectivity)
            .field("bridge", &self.inner.bridge)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ApiClient`].
///
/// Every collaborator is optional:
///
/// - `credential_store`: [`MemoryCredentialStore`]
/// - `connectivity`: a new tracker using the config's `initially_online`
/// - `navigator`: [`NoopNavigator`]
/// - `toast_sink`: [`LogToastSink`]
/// - `auth_bridge`: a new, empty [`AuthNotificationBridge`]
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use bakery_api::{ApiClient, ClientConfig};
/// use bakery_api::auth::{AuthNotificationBridge, MemoryCredentialStore};
///
/// let bridge = AuthNotificationBridge::new();
/// let client = ApiClient::builder(ClientConfig::builder().build().unwrap())
///     .credential_store(Arc::new(MemoryCredentialStore::new()))
///     .auth_bridge(bridge.clone())
///     .build()
///     .unwrap();
///
/// assert_eq!(client.base_url().as_ref(), "http://localhost:5000/api");
/// ```
pub struct ApiClientBuilder {
    config: ClientConfig,
    store: Option<Arc<dyn CredentialStore>>,
    connectivity: Option<Arc<ConnectivityTracker>>,
    navigator: Option<Arc<dyn Navigator>>,
    toasts: Option<Arc<dyn ToastSink>>,
    bridge: Option<AuthNotificationBridge>,
}

impl ApiClientBuilder {
    /// Creates a builder for `config`.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            store: None,
            connectivity: None,
            navigator: None,
            toasts: None,
            bridge: None,
        }
    }

    /// Sets where the session token is read from and cleared.
    #[must_use]
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Shares an existing connectivity tracker.
    #[must_use]
    pub fn connectivity(mut self, tracker: Arc<ConnectivityTracker>) -> Self {
        self.connectivity = Some(tracker);
        self
    }

    /// Sets the navigator used for login redirects.
    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Sets where toasts are shown.
    #[must_use]
    pub fn toast_sink(mut self, toasts: Arc<dyn ToastSink>) -> Self {
        self.toasts = Some(toasts);
        self
    }

    /// Sets the bridge notified on authentication failures.
    #[must_use]
    pub fn auth_bridge(mut self, bridge: AuthNotificationBridge) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if the HTTP transport cannot
    /// be initialized.
    pub fn build(self) -> Result<ApiClient, ConfigError> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| ConfigError::HttpClientBuild {
                reason: e.to_string(),
            })?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new()));
        let connectivity = self
            .connectivity
            .unwrap_or_else(|| ConnectivityTracker::new(self.config.initially_online()));
        let navigator = self.navigator.unwrap_or_else(|| Arc::new(NoopNavigator));
        let toasts = self.toasts.unwrap_or_else(|| Arc::new(LogToastSink));
        let bridge = self.bridge.unwrap_or_default();

        let dispatcher = SideEffectDispatcher::new(
            Arc::clone(&store),
            navigator,
            toasts,
            bridge.clone(),
            self.config.login_path(),
        );
        let default_headers = default_headers(&self.config);

        Ok(ApiClient {
            inner: Arc::new(Inner {
                http,
                config: self.config,
                default_headers,
                store,
                connectivity,
                bridge,
                dispatcher,
            }),
        })
    }
}

impl fmt::Debug for ApiClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClientBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn default_headers(config: &ClientConfig) -> HashMap<String, String> {
    let user_agent_prefix = config
        .user_agent_prefix()
        .map_or(String::new(), |prefix| format!("{prefix} | "));
    let rust_version = env!("CARGO_PKG_RUST_VERSION");
    let user_agent =
        format!("{user_agent_prefix}bakery-api-client v{SDK_VERSION} | Rust {rust_version}");

    let mut headers = HashMap::new();
    headers.insert("User-Agent".to_string(), user_agent);
    headers.insert("Accept".to_string(), JSON_CONTENT_TYPE.to_string());
    headers
}

fn insert_header(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
) -> Result<(), InvalidRequestError> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
        InvalidRequestError::InvalidHeaderName {
            name: name.to_string(),
        }
    })?;
    let header_value =
        HeaderValue::from_str(value).map_err(|_| InvalidRequestError::InvalidHeaderValue {
            name: name.to_string(),
        })?;
    headers.insert(header_name, header_value);
    Ok(())
}

/// Parses response headers into a `HashMap`.
fn parse_response_headers(headers: &HeaderMap) -> HashMap<String, Vec<String>> {
    let mut result: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        let key = name.as_str().to_lowercase();
        let value = value.to_str().unwrap_or_default().to_string();
        result.entry(key).or_default().push(value);
    }
    result
}

fn decode_as<T: DeserializeOwned>(endpoint: &str, value: Value) -> Result<T, HttpError> {
    serde_json::from_value(value).map_err(|source| {
        DecodeError::UnexpectedShape {
            endpoint: endpoint.to_string(),
            source,
        }
        .into()
    })
}
