//! Library-supplied retry conditions and backoff schedules.
//!
//! Conditions look at the most recent attempt; schedules return absolute
//! timestamps anchored on the last completion, so a slow attempt does not
//! stretch the gap to the next one.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::context::RetryContext;
use super::jitter::jitter;
use super::policy::{BackoffSchedule, RetryCondition};

/// HTTP statuses retried by default: overload and transient server errors.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Retry when the last attempt ended in a transient transport failure
/// (resolution, connect, timeout, TLS handshake, send, receive, empty
/// response).
#[must_use]
pub fn default_condition() -> RetryCondition {
    Arc::new(|ctx: &RetryContext| {
        ctx.last_attempt()
            .is_some_and(|last| last.code.is_transient())
    })
}

/// Retry when the last response's status is in `statuses`.
#[must_use]
pub fn http_status_condition<I>(statuses: I) -> RetryCondition
where
    I: IntoIterator<Item = u16>,
{
    let statuses: BTreeSet<u16> = statuses.into_iter().collect();
    Arc::new(move |ctx: &RetryContext| {
        ctx.last_attempt()
            .is_some_and(|last| statuses.contains(&last.response.status))
    })
}

/// Short-circuit OR over conditions.
#[must_use]
pub fn any_of(conditions: Vec<RetryCondition>) -> RetryCondition {
    Arc::new(move |ctx: &RetryContext| conditions.iter().any(|condition| condition(ctx)))
}

/// Short-circuit AND over conditions. True when the list is empty.
#[must_use]
pub fn all_of(conditions: Vec<RetryCondition>) -> RetryCondition {
    Arc::new(move |ctx: &RetryContext| conditions.iter().all(|condition| condition(ctx)))
}

/// Exponential backoff with optional jitter.
///
/// `delay = min(base * multiplier^attempts, max)`, plus a jitter sample
/// bounded by `delay * jitter_factor`, floored at zero.
#[must_use]
pub fn exponential_backoff(
    base_delay: f64,
    max_delay: f64,
    multiplier: f64,
    jitter_factor: f64,
) -> BackoffSchedule {
    Arc::new(move |ctx: &RetryContext| {
        let attempts = f64::from(ctx.attempt_count());
        let mut delay = (base_delay * multiplier.powf(attempts)).min(max_delay);
        if jitter_factor > 0.0 {
            delay = (delay + jitter(delay * jitter_factor)).max(0.0);
        }
        ctx.last_complete_at() + delay
    })
}

/// Linearly growing backoff: `min(initial + increment * attempts, max)`.
#[must_use]
pub fn linear_backoff(initial_delay: f64, increment: f64, max_delay: f64) -> BackoffSchedule {
    Arc::new(move |ctx: &RetryContext| {
        let attempts = f64::from(ctx.attempt_count());
        let delay = (initial_delay + increment * attempts).min(max_delay);
        ctx.last_complete_at() + delay
    })
}

/// Constant gap between attempts.
#[must_use]
pub fn fixed_delay(delay: f64) -> BackoffSchedule {
    Arc::new(move |ctx: &RetryContext| ctx.last_complete_at() + delay)
}

/// Retry immediately after completion.
#[must_use]
pub fn immediate() -> BackoffSchedule {
    Arc::new(|ctx: &RetryContext| ctx.last_complete_at())
}
