//! Engine-owned transfer bookkeeping.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use curl::easy::Easy2;

use crate::client::engine::EngineShared;
use crate::client::handle::{response_channel, Promise, TransferHandle};
use crate::error::Result;
use crate::http::{Request, RequestPolicy, Response};
use crate::retry::{RetryContext, RetryPolicy};
use crate::transport::collector::Collector;
use crate::transport::easy;

/// Retry bookkeeping attached to a task when a policy was supplied.
///
/// The context sits behind a mutex shared with the handle so user threads
/// can snapshot the attempt history without racing the engine's appends.
pub(crate) struct RetryState {
    pub context: Arc<Mutex<RetryContext>>,
    pub policy: RetryPolicy,
}

/// One submitted transfer, owned by the engine for its whole life.
///
/// A task is in at most one place at a time: the submission queue, the
/// in-flight map or the pending-retry heap. `easy` holds the parked driver
/// handle; while the transfer is attached to the multi handle the worker
/// keeps the attached form alongside the task and `easy` is empty. The
/// handle is reset between attempts, never recreated, and dropped with
/// the task.
pub(crate) struct TransferTask {
    /// The parked driver handle; taken while attached to the multi.
    pub easy: Option<Easy2<Collector>>,
    pub request: Request,
    pub policy: RequestPolicy,
    pub promise: Promise,
    pub handle: TransferHandle,
    pub retry: Option<RetryState>,
    /// Absolute time of the next attempt while parked in the retry heap.
    pub retry_at: f64,
    pub token: usize,
    /// When the task entered the submission queue; reset on re-admission.
    pub submitted_at: Instant,
    /// Queue phase of the current attempt, measured at attach.
    pub queue_time: Duration,
    /// Whether this task currently holds a concurrency permit. Paused
    /// tasks give their permit back; resume re-acquires one.
    pub holds_permit: bool,
}

impl TransferTask {
    /// Build the task, its driver handle and the user-facing handle.
    pub(crate) fn new(
        request: Request,
        policy: RequestPolicy,
        retry: Option<RetryPolicy>,
        engine: &Arc<EngineShared>,
    ) -> Result<(TransferTask, TransferHandle)> {
        let token = engine.allocate_token();
        let easy = easy::build(&request, &policy, &engine.config)?;
        let (promise, future) = response_channel();

        let retry = retry.map(|policy| RetryState {
            context: Arc::new(Mutex::new(RetryContext::default())),
            policy,
        });
        let handle = TransferHandle::new(
            token,
            Arc::downgrade(engine),
            future,
            retry.as_ref().map(|state| Arc::clone(&state.context)),
        );

        let task = TransferTask {
            easy: Some(easy),
            request,
            policy,
            promise,
            handle: handle.clone(),
            retry,
            retry_at: 0.0,
            token,
            submitted_at: Instant::now(),
            queue_time: Duration::ZERO,
            holds_permit: false,
        };
        Ok((task, handle))
    }

    /// Capture the finished attempt from the parked handle.
    pub(crate) fn finalize_response(&mut self) -> Response {
        match self.easy.as_mut() {
            Some(easy) => easy::finalize(easy, self.queue_time),
            None => Response::default(),
        }
    }
}
