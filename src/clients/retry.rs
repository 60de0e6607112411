//! Exponential backoff for retryable failures.

use std::time::Duration;

use crate::clients::errors::ApiError;

/// Backoff schedule for one logical call.
///
/// A call makes at most `max_retries + 1` attempts. The delay after failed
/// attempt `n` (0-indexed) is `retry_delay * 2^n`, without jitter. The
/// multiplication saturates rather than overflowing, and `max_backoff`, when
/// set, bounds each individual delay.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use bakery_api::clients::RetryPolicy;
///
/// let policy = RetryPolicy::new(2, Duration::from_millis(1000));
/// assert_eq!(policy.max_attempts(), 3);
/// assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
/// assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    retry_delay: Duration,
    max_backoff: Option<Duration>,
}

impl RetryPolicy {
    /// Creates an uncapped policy.
    #[must_use]
    pub const fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            max_backoff: None,
        }
    }

    /// Bounds every delay by `cap`.
    #[must_use]
    pub const fn with_max_backoff(mut self, cap: Option<Duration>) -> Self {
        self.max_backoff = cap;
        self
    }

    /// Total number of attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// The delay to wait after failed attempt `attempt` (0-indexed).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        let delay = self.retry_delay.saturating_mul(factor);
        self.max_backoff.map_or(delay, |cap| delay.min(cap))
    }

    /// Decides what to do after failed attempt `attempt` (0-indexed).
    ///
    /// Returns the delay to wait before the next attempt, or `None` when the
    /// call should fail now.
    #[must_use]
    pub fn next_delay(&self, attempt: u32, error: &ApiError) -> Option<Duration> {
        if error.retryable() && attempt.saturating_add(1) < self.max_attempts() {
            Some(self.delay_for(attempt))
        } else {
            None
        }
    }
}
