//! Reactions to failed requests.
//!
//! [`SideEffectDispatcher`] runs two kinds of side effects:
//!
//! - on authentication failure: clear the stored session, hard-redirect to
//!   the login screen (unless already there), and notify the
//!   [`AuthNotificationBridge`];
//! - on terminal failure with `show_toast`: raise a [`Toast`].
//!
//! Navigation and toasts belong to the embedding UI and are reached through
//! the [`Navigator`] and [`ToastSink`] traits.

use std::fmt;
use std::sync::Arc;

use crate::auth::{AuthNotificationBridge, CredentialStore};
use crate::clients::errors::{ApiError, ErrorCode, HttpError};

/// Access to the UI's current location and hard navigation.
pub trait Navigator: Send + Sync {
    /// Returns the current location path, if known.
    fn current_path(&self) -> Option<String>;

    /// Performs a full navigation (not an in-app transition) to `path`.
    fn redirect_hard(&self, path: &str);
}

/// A navigator for headless use. Never redirects.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn current_path(&self) -> Option<String> {
        None
    }

    fn redirect_hard(&self, path: &str) {
        tracing::debug!(path, "Ignoring login redirect without a navigator");
    }
}

/// A dismissible user notification for a failed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    /// The error's user-facing message.
    pub message: String,
    /// The error's code.
    pub code: ErrorCode,
    /// Whether the UI should offer a manual "retry" action. Wiring the action
    /// up is the caller's job.
    pub offer_retry: bool,
}

/// Displays toasts.
pub trait ToastSink: Send + Sync {
    /// Shows `toast` to the user.
    fn show(&self, toast: Toast);
}

/// Emits toasts as `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogToastSink;

impl ToastSink for LogToastSink {
    fn show(&self, toast: Toast) {
        tracing::warn!(
            code = %toast.code,
            offer_retry = toast.offer_retry,
            "{}",
            toast.message
        );
    }
}

/// Runs credential clearing, redirects and toasts for failed requests.
#[derive(Clone)]
pub struct SideEffectDispatcher {
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    toasts: Arc<dyn ToastSink>,
    bridge: AuthNotificationBridge,
    login_path: String,
}

impl SideEffectDispatcher {
    /// Creates a dispatcher over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
        toasts: Arc<dyn ToastSink>,
        bridge: AuthNotificationBridge,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            navigator,
            toasts,
            bridge,
            login_path: login_path.into(),
        }
    }

    /// Handles an authentication failure.
    ///
    /// Runs synchronously and regardless of `show_toast`. A store that fails
    /// to clear is logged; the request's own error is what the caller sees.
    pub fn handle_auth_failure(&self, error: &ApiError) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to clear stored session after auth failure: {}", e);
        }

        let on_login = self
            .navigator
            .current_path()
            .is_some_and(|path| path == self.login_path);
        if on_login {
            tracing::debug!("Auth failure on the login screen; not redirecting");
        } else {
            tracing::warn!(
                login_path = %self.login_path,
                "Session rejected by the server; redirecting to login"
            );
            self.navigator.redirect_hard(&self.login_path);
        }

        self.bridge.notify(Some(error.message()));
    }

    /// Handles a failure the caller is about to receive.
    pub fn handle_terminal_failure(&self, error: &HttpError, show_toast: bool) {
        tracing::warn!(code = %error.code(), "Request failed: {}", error);
        if !show_toast {
            return;
        }
        self.toasts.show(Toast {
            message: error.message(),
            code: error.code(),
            offer_retry: error.is_retryable(),
        });
    }
}

impl fmt::Debug for SideEffectDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SideEffectDispatcher")
            .field("login_path", &self.login_path)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}
