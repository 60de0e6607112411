//! Hand-off from the request layer to a UI-owned "unauthorized" prompt.
//!
//! The request layer has no UI context. The UI registers a handler on an
//! [`AuthNotificationBridge`] and the client calls
//! [`notify`](AuthNotificationBridge::notify) on authentication failure.
//! The bridge is a single slot, not a queue: the last registration wins.
//!
//! The bridge is an ordinary value passed to the client builder, so two
//! clients can use two bridges without interfering.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Handler invoked with an optional message when a request hits an
/// authentication failure.
pub type AuthNotificationHandler = Arc<dyn Fn(Option<&str>) + Send + Sync>;

type Slot = Arc<RwLock<Option<AuthNotificationHandler>>>;

/// A single-slot callback registry shared by cloning.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use bakery_api::auth::AuthNotificationBridge;
///
/// let bridge = AuthNotificationBridge::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = Arc::clone(&seen);
/// let registration = bridge.register(move |message| {
///     sink.lock().unwrap().push(message.map(String::from));
/// });
///
/// bridge.notify(Some("token expired"));
/// drop(registration); // unmount
/// bridge.notify(Some("ignored"));
///
/// assert_eq!(*seen.lock().unwrap(), vec![Some("token expired".to_string())]);
/// ```
#[derive(Clone, Default)]
pub struct AuthNotificationBridge {
    slot: Slot,
}

impl AuthNotificationBridge {
    /// Creates a bridge with no handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler`, replacing any previous one.
    ///
    /// Dropping the returned guard unregisters the handler, unless another
    /// handler has replaced it in the meantime.
    pub fn register<F>(&self, handler: F) -> BridgeRegistration
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        let handler: AuthNotificationHandler = Arc::new(handler);
        let previous = self
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&handler));
        if previous.is_some() {
            tracing::debug!("Replacing registered auth notification handler");
        }
        BridgeRegistration {
            slot: Arc::clone(&self.slot),
            handler: Some(handler),
        }
    }

    /// Clears the slot.
    pub fn unregister(&self) {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Returns `true` if a handler is registered.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Invokes the registered handler, or does nothing.
    pub fn notify(&self, message: Option<&str>) {
        // Clone out of the lock so the handler may re-register
        let handler = self
            .slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler(message);
        }
    }
}

impl fmt::Debug for AuthNotificationBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthNotificationBridge")
            .field("registered", &self.is_registered())
            .finish()
    }
}

/// Guard returned by [`AuthNotificationBridge::register`].
#[must_use = "dropping the registration unregisters the handler"]
pub struct BridgeRegistration {
    slot: Slot,
    handler: Option<AuthNotificationHandler>,
}

impl BridgeRegistration {
    /// Keeps the handler registered after this guard is gone.
    pub fn keep(mut self) {
        self.handler = None;
    }
}

impl Drop for BridgeRegistration {
    fn drop(&mut self) {
        let Some(handler) = self.handler.take() else {
            return;
        };
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, &handler)) {
            *slot = None;
        }
    }
}

impl fmt::Debug for BridgeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeRegistration")
            .field("active", &self.handler.is_some())
            .finish()
    }
}
