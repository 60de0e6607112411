//! Maps responses and transport failures to [`ApiError`]s.
//!
//! The status table is evaluated first; a server-supplied message then
//! replaces the default message, and a recognized server-supplied code
//! replaces the status-derived code.

use serde_json::Value;

use crate::clients::errors::{ApiError, ErrorCode};
use crate::clients::http_response::EnvelopeError;

/// Returns the code for a non-2xx HTTP status.
///
/// # Example
///
/// ```rust
/// use bakery_api::clients::classifier::code_for_status;
/// use bakery_api::ErrorCode;
///
/// assert_eq!(code_for_status(429), ErrorCode::RateLimitError);
/// assert_eq!(code_for_status(418), ErrorCode::UnknownError);
/// ```
#[must_use]
pub const fn code_for_status(status: u16) -> ErrorCode {
    match status {
        400 => ErrorCode::ValidationError,
        401 => ErrorCode::AuthenticationError,
        403 => ErrorCode::AuthorizationError,
        429 => ErrorCode::RateLimitError,
        500 | 502 | 503 | 504 => ErrorCode::ServerError,
        _ => ErrorCode::UnknownError,
    }
}

/// Recognizes a server-supplied error code.
///
/// Case is ignored and `_`, `-` and whitespace are treated alike, so
/// `INVALID_CREDENTIALS`, `invalid-credentials` and `Invalid credentials`
/// are the same code.
#[must_use]
pub fn code_for_server_code(server_code: &str) -> Option<ErrorCode> {
    let normalized = server_code
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join(" ");

    match normalized.as_str() {
        "invalid credentials" => Some(ErrorCode::AuthenticationError),
        "missing required fields" | "validation error" => Some(ErrorCode::ValidationError),
        _ => ErrorCode::ALL
            .into_iter()
            .find(|code| code.as_str().replace('_', " ").eq_ignore_ascii_case(&normalized)),
    }
}

/// Classifies a failed response.
///
/// `status` is the transport status. When it is 2xx (an in-band
/// `success: false`), the body's `statusCode` is used for the table lookup
/// if present.
#[must_use]
pub fn classify_response(status: u16, body: &Value) -> ApiError {
    let envelope = EnvelopeError::from_body(body);
    classify_envelope(status, &envelope)
}

/// Classifies a failure from already-extracted envelope error fields.
#[must_use]
pub fn classify_envelope(status: u16, envelope: &EnvelopeError) -> ApiError {
    let lookup_status = if (200..300).contains(&status) {
        envelope.status_code.unwrap_or(status)
    } else {
        status
    };
    let status_code = code_for_status(lookup_status);

    let code = envelope
        .code
        .as_deref()
        .and_then(code_for_server_code)
        .unwrap_or(status_code);

    let message = envelope
        .message
        .as_deref()
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| status_code.default_message());

    let mut error = ApiError::new(code, message).with_status(status);
    if let Some(details) = &envelope.details {
        error = error.with_details(details.clone());
    }
    error
}

/// Classifies a failure where no response was received.
#[must_use]
pub fn classify_transport(error: &reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::from_code(ErrorCode::TimeoutError)
    } else {
        ApiError::from_code(ErrorCode::NetworkError)
    }
}
