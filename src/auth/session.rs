//! The persisted login record.
//!
//! This module provides the [`Session`] type: the token, role and display
//! name a branch or admin user gets after logging in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated session for bakery API calls.
///
/// Sessions are stored in a [`CredentialStore`](crate::auth::CredentialStore)
/// and read on every request. The token is masked in `Debug` output.
///
/// # Example
///
/// ```rust
/// use bakery_api::Session;
///
/// let session = Session::new("jwt-token", "admin", "Ayu");
///
/// assert!(session.is_active());
/// assert_eq!(session.role, "admin");
/// assert!(!format!("{session:?}").contains("jwt-token"));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token sent as `Authorization: Bearer <token>`.
    pub token: String,

    /// The user's role (e.g. `admin` or `branch`).
    pub role: String,

    /// Display name.
    pub name: String,

    /// When this session was stored.
    pub stored_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new session stamped with the current time.
    #[must_use]
    pub fn new(token: impl Into<String>, role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            role: role.into(),
            name: name.into(),
            stored_at: Utc::now(),
        }
    }

    /// Returns `true` if the session carries a token.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.token.is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"*****")
            .field("role", &self.role)
            .field("name", &self.name)
            .field("stored_at", &self.stored_at)
            .finish()
    }
}

// Verify Session is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Session>();
};
