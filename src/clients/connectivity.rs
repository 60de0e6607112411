//! Connectivity tracking and the offline request queue.
//!
//! [`ConnectivityTracker`] holds the process-wide online flag. It does not
//! poll: the embedding application reports platform transitions through
//! [`ConnectivityTracker::set_online`] and [`ConnectivityTracker::set_offline`].
//!
//! While offline, calls made through the client fail fast with
//! `OFFLINE_ERROR`, and work handed to [`ConnectivityTracker::enqueue`] is
//! held until connectivity returns, then run in enqueue order.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;

type QueuedRequest = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// What [`ConnectivityTracker::enqueue`] did with a thunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueOutcome {
    /// Online: the thunk was spawned right away.
    Spawned,
    /// Offline (or no runtime to spawn on): the thunk waits for a drain.
    Queued,
}

/// Process-wide online/offline state plus the offline request queue.
///
/// Shared through an [`Arc`]; the client and the embedding application hold
/// the same tracker.
///
/// # Example
///
/// ```rust
/// use bakery_api::clients::ConnectivityTracker;
///
/// let tracker = ConnectivityTracker::new(true);
/// assert!(tracker.is_online());
///
/// tracker.set_offline();
/// assert!(!tracker.is_online());
/// ```
pub struct ConnectivityTracker {
    state: watch::Sender<bool>,
    queue: Mutex<VecDeque<QueuedRequest>>,
    drain_lock: tokio::sync::Mutex<()>,
}

impl ConnectivityTracker {
    /// Creates a tracker with the platform's current online indicator.
    #[must_use]
    pub fn new(initially_online: bool) -> Arc<Self> {
        let (state, _) = watch::channel(initially_online);
        Arc::new(Self {
            state,
            queue: Mutex::new(VecDeque::new()),
            drain_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Returns `true` if the last reported state is online.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Returns a receiver that observes every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Number of thunks waiting for connectivity.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.lock_queue().len()
    }

    /// Reports a transition to online and starts draining the queue.
    ///
    /// The drain is spawned on the current tokio runtime. Without one, the
    /// queue is left for an explicit [`drain_queue`](Self::drain_queue).
    /// Reporting online while already online does nothing.
    pub fn set_online(self: &Arc<Self>) {
        if !self.transition(true) {
            return;
        }
        let pending = self.queued_len();
        tracing::info!(pending, "Connectivity restored");

        if pending == 0 {
            return;
        }
        match Handle::try_current() {
            Ok(handle) => {
                let tracker = Arc::clone(self);
                handle.spawn(async move {
                    tracker.drain_queue().await;
                });
            }
            Err(_) => {
                tracing::debug!("No async runtime available; queued requests wait for drain_queue()");
            }
        }
    }

    /// Reports a transition to offline.
    pub fn set_offline(&self) {
        if self.transition(false) {
            tracing::info!("Connectivity lost; requests will fail fast until it returns");
        }
    }

    /// Hands a deferred request to the tracker.
    ///
    /// While offline the thunk is queued. While online it is spawned at once.
    pub fn enqueue<F, Fut>(&self, thunk: F) -> QueueOutcome
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let boxed: QueuedRequest = Box::new(move || Box::pin(thunk()));

        // The state check and the push happen under the queue lock so that a
        // concurrent set_online either sees this thunk or happened before it.
        let mut queue = self.lock_queue();
        if self.is_online() {
            if let Ok(handle) = Handle::try_current() {
                drop(queue);
                handle.spawn(boxed());
                return QueueOutcome::Spawned;
            }
        }
        queue.push_back(boxed);
        tracing::debug!(pending = queue.len(), "Request queued until connectivity returns");
        QueueOutcome::Queued
    }

    /// Runs queued thunks one at a time in enqueue order.
    ///
    /// Stops early if connectivity is lost again; the remaining thunks stay
    /// queued. Thunks enqueued during the drain are picked up by it. Returns
    /// the number of thunks run.
    pub async fn drain_queue(&self) -> usize {
        let _guard = self.drain_lock.lock().await;
        let mut drained = 0;
        loop {
            if !self.is_online() {
                break;
            }
            let Some(next) = self.lock_queue().pop_front() else {
                break;
            };
            next().await;
            drained += 1;
        }
        if drained > 0 {
            tracing::info!(drained, "Drained offline request queue");
        }
        drained
    }

    fn transition(&self, online: bool) -> bool {
        self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        })
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<QueuedRequest>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ConnectivityTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityTracker")
            .field("online", &self.is_online())
            .field("queued", &self.queued_len())
            .finish()
    }
}

// Verify ConnectivityTracker is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ConnectivityTracker>();
};
