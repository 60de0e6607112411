//! Response types for the bakery API client.
//!
//! This module provides [`HttpResponse`], the parsed form of one HTTP
//! response, and [`Envelope`], the explicit decode of the optional
//! `{success, data, error}` wrapping the backend may use.

use std::collections::HashMap;

use serde_json::Value;

use crate::clients::errors::DecodeError;

/// A response body, parsed according to its declared content type.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedBody {
    /// The body declared a JSON content type. An empty body is `Null`.
    Json(Value),
    /// Any other content type, kept as raw text.
    Text(String),
}

impl ParsedBody {
    /// Parses `text` as JSON when `content_type` declares JSON, otherwise
    /// keeps it as text.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidJson`] if the body declares JSON but does
    /// not parse.
    pub fn parse(
        endpoint: &str,
        content_type: Option<&str>,
        text: String,
    ) -> Result<Self, DecodeError> {
        if !content_type.is_some_and(is_json_content_type) {
            return Ok(Self::Text(text));
        }
        if text.trim().is_empty() {
            return Ok(Self::Json(Value::Null));
        }
        serde_json::from_str(&text)
            .map(Self::Json)
            .map_err(|source| DecodeError::InvalidJson {
                endpoint: endpoint.to_string(),
                source,
            })
    }

    /// Converts the body into a JSON value. Text becomes a JSON string.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

/// Returns `true` for `application/json` and any `+json` media type.
#[must_use]
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// An HTTP response from the bakery API.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers, lowercased (headers may have multiple values).
    pub headers: HashMap<String, Vec<String>>,
    /// The parsed response body.
    pub body: ParsedBody,
}

impl HttpResponse {
    /// Creates a new `HttpResponse`.
    #[must_use]
    pub const fn new(code: u16, headers: HashMap<String, Vec<String>>, body: ParsedBody) -> Self {
        Self {
            code,
            headers,
            body,
        }
    }

    /// Returns `true` if the response status code is in the 2xx range.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns the first value of a header, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the `X-Request-Id` header value, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header("x-request-id")
    }
}

/// The error object inside a failure envelope.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvelopeError {
    /// Server-supplied message.
    pub message: Option<String>,
    /// Server-supplied code (free-form string).
    pub code: Option<String>,
    /// Server-supplied status, used when the transport status was 2xx.
    pub status_code: Option<u16>,
    /// Opaque extra information.
    pub details: Option<Value>,
}

impl EnvelopeError {
    /// Extracts the error information a response body carries, if any.
    ///
    /// Recognized shapes are `{"error": {"message", "code", "statusCode",
    /// "details"}}`, `{"error": "text"}` and a top-level `{"message": "text"}`.
    #[must_use]
    pub fn from_body(body: &Value) -> Self {
        let mut error = Self::default();
        match body.get("error") {
            Some(Value::Object(obj)) => {
                error.message = obj.get("message").and_then(Value::as_str).map(String::from);
                error.code = obj.get("code").and_then(Value::as_str).map(String::from);
                error.status_code = obj
                    .get("statusCode")
                    .or_else(|| obj.get("status_code"))
                    .and_then(Value::as_u64)
                    .and_then(|status| u16::try_from(status).ok());
                error.details = obj.get("details").cloned();
            }
            Some(Value::String(message)) => error.message = Some(message.clone()),
            _ => {}
        }
        if error.message.is_none() {
            error.message = body.get("message").and_then(Value::as_str).map(String::from);
        }
        error
    }
}

/// The backend's response shape, decoded explicitly.
///
/// # Example
///
/// ```rust
/// use bakery_api::clients::Envelope;
/// use serde_json::json;
///
/// let envelope = Envelope::decode("/foods", json!({"success": true, "data": [1, 2]})).unwrap();
/// assert_eq!(envelope, Envelope::Success(json!([1, 2])));
///
/// let bare = Envelope::decode("/foods", json!([{"food_id": 1}])).unwrap();
/// assert_eq!(bare, Envelope::Bare(json!([{"food_id": 1}])));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    /// No envelope: the body is domain data as-is.
    Bare(Value),
    /// `success: true`, carrying the nested `data` (`null` if absent).
    Success(Value),
    /// `success: false`, carrying whatever error information was sent.
    Failure(EnvelopeError),
}

impl Envelope {
    /// Decodes a parsed body into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MalformedEnvelope`] if the body is an object
    /// with a `success` field that is not a boolean.
    pub fn decode(endpoint: &str, body: Value) -> Result<Self, DecodeError> {
        let success = match body.as_object().and_then(|obj| obj.get("success")) {
            None => return Ok(Self::Bare(body)),
            Some(Value::Bool(success)) => *success,
            Some(other) => {
                return Err(DecodeError::MalformedEnvelope {
                    endpoint: endpoint.to_string(),
                    reason: format!("`success` must be a boolean, got {other}"),
                })
            }
        };

        if success {
            let data = match body {
                Value::Object(mut obj) => obj.remove("data").unwrap_or(Value::Null),
                _ => Value::Null,
            };
            Ok(Self::Success(data))
        } else {
            Ok(Self::Failure(EnvelopeError::from_body(&body)))
        }
    }
}
