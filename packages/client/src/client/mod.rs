//! The HTTP client: public submission API over the transfer engine.

pub(crate) mod engine;
mod handle;
mod task;

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub use handle::{ResponseFuture, TransferHandle, TransferState};

use crate::config::ClientConfig;
use crate::error::{self, Result};
use crate::http::{Request, RequestPolicy, Response};
use crate::retry::{jitter, RetryPolicy};
use crate::telemetry::SpeedSnapshot;
use crate::transport::waker::wake_pair;

use self::engine::EngineShared;
use self::task::TransferTask;

/// Client-side HTTP engine multiplexing many transfers over a bounded
/// connection pool.
///
/// A client owns one worker thread that drives every transfer submitted to
/// it. Submission returns a [`TransferHandle`] carrying lifecycle control
/// and the response future; [`HttpClient::await_request`] is the blocking
/// shorthand. Dropping the client stops the engine and fails whatever is
/// still in flight.
pub struct HttpClient {
    shared: Arc<EngineShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HttpClient {
    /// Create a client with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with explicit settings.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|message| error::builder_message(&message, None))?;

        let (waker, wake_rx) = match wake_pair() {
            Ok((waker, rx)) => (Some(waker), Some(rx)),
            Err(e) => {
                tracing::warn!(
                    target: "convoy::client",
                    "poll waker unavailable, commands degrade to the poll ceiling: {e}"
                );
                (None, None)
            }
        };

        let shared = Arc::new(EngineShared::new(config, waker));
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("convoy-engine".to_string())
            .spawn(move || engine::run(worker_shared, wake_rx))
            .map_err(error::spawn)?;

        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Submit a transfer and get its control handle.
    ///
    /// Blocks while the pool is saturated: the permit for the transfer is
    /// acquired here, before it enters the engine's submission queue.
    pub fn submit(&self, request: Request, policy: RequestPolicy) -> Result<TransferHandle> {
        self.enqueue(request, policy, None)
    }

    /// Submit a transfer that re-attempts per `retry`.
    pub fn submit_with_retry(
        &self,
        request: Request,
        policy: RequestPolicy,
        retry: RetryPolicy,
    ) -> Result<TransferHandle> {
        self.enqueue(request, policy, Some(retry))
    }

    /// Submit and block until the transfer resolves.
    pub fn await_request(&self, request: Request, policy: RequestPolicy) -> Result<Response> {
        self.submit(request, policy)?.wait()
    }

    /// Submit with a retry policy and block until the transfer resolves.
    pub fn await_request_with_retry(
        &self,
        request: Request,
        policy: RequestPolicy,
        retry: RetryPolicy,
    ) -> Result<Response> {
        self.submit_with_retry(request, policy, retry)?.wait()
    }

    fn enqueue(
        &self,
        request: Request,
        policy: RequestPolicy,
        retry: Option<RetryPolicy>,
    ) -> Result<TransferHandle> {
        if let Some(message) = request.error() {
            return Err(error::builder_message(message, Some(request.url().clone())));
        }
        if self.shared.lock_mailbox().stopped {
            return Err(error::stopped());
        }

        let (mut task, handle) = TransferTask::new(request, policy, retry, &self.shared)?;

        self.shared.permits.acquire();
        task.holds_permit = true;

        // Desynchronize submission bursts with a sub-millisecond sleep.
        let delay = jitter(0.001).abs();
        if delay > 0.0 {
            thread::sleep(Duration::from_secs_f64(delay));
        }

        {
            let mut mailbox = self.shared.lock_mailbox();
            if mailbox.stopped {
                self.shared.permits.release();
                return Err(error::stopped());
            }
            mailbox.submissions.push_back(task);
        }
        self.shared.wake();

        Ok(handle)
    }

    /// Initiate shutdown and join the worker.
    ///
    /// Every pending and in-flight transfer fails with a stopped-engine
    /// error. Safe to call more than once.
    pub fn stop(&self) {
        {
            let mut mailbox = self.shared.lock_mailbox();
            mailbox.stopped = true;
        }
        self.shared.wake();

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(worker) = worker {
            if worker.thread().id() != thread::current().id() {
                if let Err(e) = worker.join() {
                    tracing::error!(target: "convoy::client", "engine worker panicked: {e:?}");
                }
            }
        }
    }

    /// Window-mean upload speed in bytes/s.
    #[must_use]
    pub fn uplink_speed(&self) -> f64 {
        self.shared.speed.uplink()
    }

    /// Window-mean download speed in bytes/s.
    #[must_use]
    pub fn downlink_speed(&self) -> f64 {
        self.shared.speed.downlink()
    }

    /// Window-max upload speed in bytes/s.
    #[must_use]
    pub fn peak_uplink_speed(&self) -> f64 {
        self.shared.speed.peak_uplink()
    }

    /// Window-max download speed in bytes/s.
    #[must_use]
    pub fn peak_downlink_speed(&self) -> f64 {
        self.shared.speed.peak_downlink()
    }

    /// All four speed aggregates at once.
    #[must_use]
    pub fn speed_snapshot(&self) -> SpeedSnapshot {
        self.shared.speed.snapshot()
    }

    /// The settings this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }
}

impl Drop for HttpClient {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.shared.config)
            .finish()
    }
}
