//! Retry policy: limits plus pluggable condition and backoff closures.

use std::fmt;
use std::sync::Arc;

use super::context::RetryContext;
use super::strategies;

/// Decides whether the attempt history warrants another try.
pub type RetryCondition = Arc<dyn Fn(&RetryContext) -> bool + Send + Sync>;

/// Returns the absolute time, in seconds since the epoch, at which the next
/// attempt should start. Schedules are anchored on
/// [`RetryContext::last_complete_at`], not on "now".
pub type BackoffSchedule = Arc<dyn Fn(&RetryContext) -> f64 + Send + Sync>;

/// Configuration for retry behavior.
///
/// Both closures are invoked only from the engine's worker thread. The
/// default policy retries up to three times on transient transport errors
/// or retryable HTTP statuses, with jittered exponential backoff and no
/// total-time budget.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum retry attempts, not counting the initial one.
    pub max_retries: u32,
    /// Budget in seconds from the first attempt, 0 = unbounded. The budget
    /// never interrupts an attempt already in flight; it gates starting
    /// another one.
    pub total_timeout: f64,
    /// Retry condition.
    pub should_retry: RetryCondition,
    /// Backoff schedule.
    pub next_retry_at: BackoffSchedule,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            total_timeout: 0.0,
            should_retry: strategies::any_of(vec![
                strategies::default_condition(),
                strategies::http_status_condition(strategies::RETRYABLE_STATUSES),
            ]),
            next_retry_at: strategies::exponential_backoff(0.1, 30.0, 2.0, 0.3),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries; useful to force attempt bookkeeping
    /// without re-execution.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            total_timeout: 0.0,
            should_retry: Arc::new(|_| false),
            next_retry_at: strategies::immediate(),
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_total_timeout(mut self, seconds: f64) -> Self {
        self.total_timeout = seconds.max(0.0);
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: RetryCondition) -> Self {
        self.should_retry = condition;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, schedule: BackoffSchedule) -> Self {
        self.next_retry_at = schedule;
        self
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("total_timeout", &self.total_timeout)
            .field("should_retry", &"<closure>")
            .field("next_retry_at", &"<closure>")
            .finish()
    }
}
