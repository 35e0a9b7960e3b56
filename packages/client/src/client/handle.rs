//! User-visible transfer handle: lifecycle control plus the response future.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::time::{Duration, Instant};

use crate::client::engine::EngineShared;
use crate::error::{Error, Result};
use crate::http::Response;
use crate::retry::RetryContext;

/// Lifecycle state of a transfer.
///
/// `Completed` and `Failed` are terminal. A cancel that the engine has
/// acted on leaves the handle at `CancelRequested`; from that point the
/// state is terminal too and the future carries the cancellation error.
/// States only move toward terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransferState {
    /// Submitted, not yet attached to the driver.
    Pending = 0,
    /// Attached and transferring.
    Ongoing = 1,
    /// Paused; its concurrency slot has been returned to the pool.
    Paused = 2,
    /// Pause requested, not yet acted on by the engine.
    PauseRequested = 3,
    /// Resume requested, waiting for the engine (and a free slot).
    ResumeRequested = 4,
    /// Cancel requested; terminal once the engine processes it.
    CancelRequested = 5,
    /// The future holds the final response.
    Completed = 6,
    /// The future holds an engine-level failure.
    Failed = 7,
}

impl TransferState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TransferState::Pending,
            1 => TransferState::Ongoing,
            2 => TransferState::Paused,
            3 => TransferState::PauseRequested,
            4 => TransferState::ResumeRequested,
            5 => TransferState::CancelRequested,
            6 => TransferState::Completed,
            _ => TransferState::Failed,
        }
    }

    /// True for `Completed` and `Failed`.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferState::Completed | TransferState::Failed)
    }
}

struct FutureSlot {
    outcome: Mutex<Option<Result<Response>>>,
    cv: Condvar,
}

/// Single-producer, multi-consumer future of the final [`Response`].
///
/// Cloned futures observe the same single fulfillment. Cancellation and
/// engine shutdown arrive as `Err`; every transport or HTTP outcome,
/// including exhausted retries, arrives as `Ok(Response)`.
#[derive(Clone)]
pub struct ResponseFuture {
    slot: Arc<FutureSlot>,
}

impl ResponseFuture {
    /// Block until the transfer resolves.
    pub fn wait(&self) -> Result<Response> {
        let mut outcome = self.lock();
        while outcome.is_none() {
            outcome = self
                .slot
                .cv
                .wait(outcome)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        outcome
            .as_ref()
            .cloned()
            .unwrap_or_else(|| Err(Error::new(crate::error::Kind::Stopped)))
    }

    /// Block up to `timeout`; `None` when the transfer is still unresolved.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Response>> {
        let deadline = Instant::now() + timeout;
        let mut outcome = self.lock();
        while outcome.is_none() {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let (guard, result) = self
                .slot
                .cv
                .wait_timeout(outcome, remaining)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            outcome = guard;
            if result.timed_out() && outcome.is_none() {
                return None;
            }
        }
        outcome.as_ref().cloned()
    }

    /// The outcome, if already resolved.
    #[must_use]
    pub fn try_get(&self) -> Option<Result<Response>> {
        self.lock().as_ref().cloned()
    }

    /// True once the transfer has resolved.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Result<Response>>> {
        self.slot
            .outcome
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ResponseFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseFuture")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Write side of the future. Engine-owned; fulfills at most once.
pub(crate) struct Promise {
    slot: Arc<FutureSlot>,
}

impl Promise {
    /// Resolve the future. A second fulfillment is an engine bug; it is
    /// asserted in debug builds and ignored in release.
    pub(crate) fn fulfill(&self, outcome: Result<Response>) {
        let mut slot = self
            .slot
            .outcome
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            debug_assert!(false, "transfer promise fulfilled twice");
            return;
        }
        *slot = Some(outcome);
        self.slot.cv.notify_all();
    }
}

/// Create a connected promise/future pair.
pub(crate) fn response_channel() -> (Promise, ResponseFuture) {
    let slot = Arc::new(FutureSlot {
        outcome: Mutex::new(None),
        cv: Condvar::new(),
    });
    (
        Promise {
            slot: Arc::clone(&slot),
        },
        ResponseFuture { slot },
    )
}

struct HandleShared {
    state: AtomicU8,
    token: usize,
    engine: Weak<EngineShared>,
    future: ResponseFuture,
    attempts: AtomicU32,
    retry_context: Option<Arc<Mutex<RetryContext>>>,
}

/// Control handle for one submitted transfer.
///
/// Cheap to clone; all clones drive the same transfer. The handle never
/// touches engine-owned collections: commands flip the atomic state word,
/// post the handle's driver key to the engine mailbox and wake the worker,
/// which performs the actual transition on its next pass.
#[derive(Clone)]
pub struct TransferHandle {
    inner: Arc<HandleShared>,
}

impl TransferHandle {
    pub(crate) fn new(
        token: usize,
        engine: Weak<EngineShared>,
        future: ResponseFuture,
        retry_context: Option<Arc<Mutex<RetryContext>>>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleShared {
                state: AtomicU8::new(TransferState::Pending as u8),
                token,
                engine,
                future,
                attempts: AtomicU32::new(0),
                retry_context,
            }),
        }
    }

    /// Request cancellation. Allowed from any non-terminal state and
    /// idempotent; a cancel racing with natural completion loses.
    pub fn cancel(&self) {
        loop {
            let current = self.state();
            if current.is_terminal() || current == TransferState::CancelRequested {
                return;
            }
            if self.cas_state(current, TransferState::CancelRequested) {
                break;
            }
        }
        self.post_event();
    }

    /// Request a pause. Only an `Ongoing` transfer can be paused; anything
    /// else is a no-op.
    pub fn pause(&self) {
        if self.cas_state(TransferState::Ongoing, TransferState::PauseRequested) {
            self.post_event();
        }
    }

    /// Request a resume. Only a `Paused` transfer can be resumed; a resume
    /// racing with an unprocessed pause is dropped.
    pub fn resume(&self) {
        if self.cas_state(TransferState::Paused, TransferState::ResumeRequested) {
            self.post_event();
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransferState {
        TransferState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// True when the transfer carries a retry policy.
    #[must_use]
    pub fn has_retry(&self) -> bool {
        self.inner.retry_context.is_some()
    }

    /// Attempts completed so far (including the initial one).
    #[must_use]
    pub fn attempt_count(&self) -> u32 {
        self.inner.attempts.load(Ordering::Acquire)
    }

    /// Snapshot of the attempt history, `None` without a retry policy.
    #[must_use]
    pub fn retry_context(&self) -> Option<RetryContext> {
        self.inner.retry_context.as_ref().map(|ctx| {
            ctx.lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone()
        })
    }

    /// The response future for this transfer.
    #[must_use]
    pub fn future(&self) -> ResponseFuture {
        self.inner.future.clone()
    }

    /// Convenience for `future().wait()`.
    pub fn wait(&self) -> Result<Response> {
        self.inner.future.wait()
    }

    pub(crate) fn token(&self) -> usize {
        self.inner.token
    }

    pub(crate) fn store_state(&self, state: TransferState) {
        self.inner.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn cas_state(&self, from: TransferState, to: TransferState) -> bool {
        self.inner
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn set_attempts(&self, attempts: u32) {
        self.inner.attempts.store(attempts, Ordering::Release);
    }

    pub(crate) fn bump_attempts(&self) {
        self.inner.attempts.fetch_add(1, Ordering::AcqRel);
    }

    /// Post this handle's driver key to the engine mailbox and wake the
    /// worker. Dropped silently once the engine is gone.
    fn post_event(&self) {
        if let Some(engine) = self.inner.engine.upgrade() {
            engine.push_event(self.inner.token);
            engine.wake();
        }
    }
}

impl std::fmt::Debug for TransferHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferHandle")
            .field("token", &self.inner.token)
            .field("state", &self.state())
            .field("attempts", &self.attempt_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detached_handle() -> TransferHandle {
        let (_, future) = response_channel();
        TransferHandle::new(1, Weak::new(), future, None)
    }

    #[test]
    fn future_resolves_for_all_clones() {
        let (promise, future) = response_channel();
        let other = future.clone();
        assert!(!future.is_ready());
        promise.fulfill(Ok(Response {
            status: 200,
            ..Response::default()
        }));
        let resolved = future.wait().expect("future resolves");
        assert_eq!(resolved.status, 200);
        assert_eq!(other.try_get().and_then(|r| r.ok()).map(|r| r.status), Some(200));
    }

    #[test]
    fn wait_timeout_returns_none_while_unresolved() {
        let (_promise, future) = response_channel();
        assert!(future.wait_timeout(Duration::from_millis(30)).is_none());
    }

    #[test]
    fn second_fulfillment_is_ignored_in_release() {
        let (promise, future) = response_channel();
        promise.fulfill(Ok(Response::default()));
        // Double fulfillment asserts in debug builds, so only exercise the
        // release-mode behavior there.
        if !cfg!(debug_assertions) {
            promise.fulfill(Err(Error::new(crate::error::Kind::Stopped)));
        }
        assert!(future.wait().is_ok());
    }

    #[test]
    fn cancel_is_sticky_and_idempotent() {
        let handle = detached_handle();
        handle.cancel();
        assert_eq!(handle.state(), TransferState::CancelRequested);
        handle.cancel();
        assert_eq!(handle.state(), TransferState::CancelRequested);
        handle.pause();
        handle.resume();
        assert_eq!(handle.state(), TransferState::CancelRequested);
    }

    #[test]
    fn cancel_does_not_overwrite_terminal_states() {
        let handle = detached_handle();
        handle.store_state(TransferState::Completed);
        handle.cancel();
        assert_eq!(handle.state(), TransferState::Completed);
    }

    #[test]
    fn pause_requires_ongoing() {
        let handle = detached_handle();
        handle.pause();
        assert_eq!(handle.state(), TransferState::Pending);
        handle.store_state(TransferState::Ongoing);
        handle.pause();
        assert_eq!(handle.state(), TransferState::PauseRequested);
    }

    #[test]
    fn resume_requires_paused() {
        let handle = detached_handle();
        handle.store_state(TransferState::PauseRequested);
        handle.resume();
        // A resume racing with an unprocessed pause is dropped.
        assert_eq!(handle.state(), TransferState::PauseRequested);
        handle.store_state(TransferState::Paused);
        handle.resume();
        assert_eq!(handle.state(), TransferState::ResumeRequested);
    }
}
