//! Attempt history handed to retry conditions and backoff schedules.

use crate::http::Response;
use crate::transport::TransportCode;

/// Record of a single transfer attempt.
#[derive(Debug, Clone, Default)]
pub struct AttemptRecord {
    /// Response snapshot from this attempt.
    pub response: Response,
    /// Driver terminal code, `Ok` when an HTTP response was received.
    pub code: TransportCode,
    /// When this attempt completed, in seconds since the epoch.
    pub complete_at: f64,
}

/// Everything a retry decision can see: the ordered attempt history (most
/// recent last) and when the first attempt started.
#[derive(Debug, Clone, Default)]
pub struct RetryContext {
    /// History of all attempts, last element most recent.
    pub attempts: Vec<AttemptRecord>,
    /// When the first attempt started, in seconds since the epoch.
    pub first_attempt_at: f64,
}

impl RetryContext {
    /// Number of attempts made so far.
    #[inline]
    #[must_use]
    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    /// The most recent attempt, if any.
    #[inline]
    #[must_use]
    pub fn last_attempt(&self) -> Option<&AttemptRecord> {
        self.attempts.last()
    }

    /// Completion time of the most recent attempt, 0 when none exist.
    #[inline]
    #[must_use]
    pub fn last_complete_at(&self) -> f64 {
        self.attempts.last().map_or(0.0, |a| a.complete_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_accessors() {
        let ctx = RetryContext::default();
        assert_eq!(ctx.attempt_count(), 0);
        assert!(ctx.last_attempt().is_none());
        assert_eq!(ctx.last_complete_at(), 0.0);
    }

    #[test]
    fn last_attempt_is_the_most_recent() {
        let mut ctx = RetryContext::default();
        for (i, at) in [(500u16, 10.0), (503, 20.0)] {
            ctx.attempts.push(AttemptRecord {
                response: Response {
                    status: i,
                    ..Response::default()
                },
                code: TransportCode::Ok,
                complete_at: at,
            });
        }
        assert_eq!(ctx.attempt_count(), 2);
        assert_eq!(ctx.last_attempt().map(|a| a.response.status), Some(503));
        assert_eq!(ctx.last_complete_at(), 20.0);
    }
}
