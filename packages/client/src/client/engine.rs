//! The transfer engine's worker loop.
//!
//! One dedicated thread per engine is the sole mutator of the in-flight
//! map, the pending-retry heap and the driver multi handle. Everything
//! crossing the thread boundary goes through [`EngineShared`]: the
//! mutex-guarded mailbox, the permit semaphore, the published speed stats
//! and the poll waker. Attached driver handles are bound to the multi and
//! live only in the worker's in-flight map; tasks cross threads with
//! their handle parked.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use curl::multi::{Easy2Handle, Multi, WaitFd};

use crate::client::handle::TransferState;
use crate::client::task::TransferTask;
use crate::config::ClientConfig;
use crate::error;
use crate::http::Response;
use crate::sync::BoundedSemaphore;
use crate::telemetry::{SlidingWindow, SpeedStats};
use crate::transport::collector::Collector;
use crate::transport::easy;
use crate::transport::waker::{PollWaker, WakeReceiver};
use crate::transport::TransportCode;
use crate::util::epoch_secs;

/// Cross-thread mailbox: pending submissions, lifecycle events (driver
/// keys) and the stop flag. Held only briefly to push or drain.
#[derive(Default)]
pub(crate) struct Mailbox {
    pub submissions: VecDeque<TransferTask>,
    pub events: VecDeque<usize>,
    pub stopped: bool,
}

/// State shared between user threads and the worker.
pub(crate) struct EngineShared {
    pub config: ClientConfig,
    pub mailbox: Mutex<Mailbox>,
    pub permits: BoundedSemaphore,
    pub speed: SpeedStats,
    pub waker: Option<PollWaker>,
    next_token: AtomicUsize,
}

impl EngineShared {
    pub(crate) fn new(config: ClientConfig, waker: Option<PollWaker>) -> Self {
        let permits = BoundedSemaphore::new(config.max_connections, config.max_connections);
        Self {
            config,
            mailbox: Mutex::new(Mailbox::default()),
            permits,
            speed: SpeedStats::default(),
            waker,
            next_token: AtomicUsize::new(1),
        }
    }

    pub(crate) fn allocate_token(&self) -> usize {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn lock_mailbox(&self) -> MutexGuard<'_, Mailbox> {
        self.mailbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a lifecycle event for the worker. Dropped once stopped.
    pub(crate) fn push_event(&self, token: usize) {
        let mut mailbox = self.lock_mailbox();
        if !mailbox.stopped {
            mailbox.events.push_back(token);
        }
    }

    /// Unblock the worker's driver poll.
    pub(crate) fn wake(&self) {
        if let Some(waker) = &self.waker {
            waker.wake();
        }
    }
}

/// A transfer currently attached to the driver, paused or not. The
/// attached driver handle is bound to the multi and must not leave the
/// worker thread.
struct InFlight {
    driver: Easy2Handle<Collector>,
    task: TransferTask,
}

/// Entry in the pending-retry min-heap, ordered by absolute retry time
/// with submission order as the tie-break.
struct PendingRetry {
    at_micros: u64,
    seq: u64,
    task: TransferTask,
}

impl PartialEq for PendingRetry {
    fn eq(&self, other: &Self) -> bool {
        self.at_micros == other.at_micros && self.seq == other.seq
    }
}

impl Eq for PendingRetry {}

impl PartialOrd for PendingRetry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingRetry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reversed: BinaryHeap is a max-heap, the earliest time must win.
        other
            .at_micros
            .cmp(&self.at_micros)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Worker entry point. Builds the driver multi handle on the worker thread
/// and runs the loop until stop is requested.
pub(crate) fn run(shared: Arc<EngineShared>, wake_rx: Option<WakeReceiver>) {
    let mut multi = Multi::new();
    // HTTP/2 multiplexing on, HTTP/1.1 pipelining off.
    if let Err(e) = multi.pipelining(false, true) {
        tracing::warn!(target: "convoy::engine", "driver multiplexing setup failed: {e}");
    }
    if let Err(e) = multi.set_max_host_connections(shared.config.max_host_connections) {
        tracing::warn!(target: "convoy::engine", "per-host connection cap rejected: {e}");
    }
    if let Err(e) = multi.set_max_total_connections(shared.config.max_total_connections) {
        tracing::warn!(target: "convoy::engine", "total connection cap rejected: {e}");
    }
    if let Err(e) = multi.set_max_connects(shared.config.max_connections) {
        tracing::warn!(target: "convoy::engine", "connection cache advisory rejected: {e}");
    }

    let window = shared.config.speed_track_window;
    let mut worker = Worker {
        shared,
        multi,
        wake_rx,
        inflight: HashMap::new(),
        pending_retries: BinaryHeap::new(),
        uplink: SlidingWindow::new(window),
        downlink: SlidingWindow::new(window),
        retry_seq: 0,
    };
    worker.run();
}

struct Worker {
    shared: Arc<EngineShared>,
    multi: Multi,
    wake_rx: Option<WakeReceiver>,
    /// Transfers attached to the driver, keyed by token. Each entry
    /// doubles as the lookup-map entry and the in-flight list entry.
    inflight: HashMap<usize, InFlight>,
    pending_retries: BinaryHeap<PendingRetry>,
    uplink: SlidingWindow,
    downlink: SlidingWindow,
    retry_seq: u64,
}

impl Worker {
    fn run(&mut self) {
        tracing::debug!(target: "convoy::engine", "worker started");
        loop {
            self.drive();
            self.harvest_completions();
            let timeout = self.next_poll_timeout();
            self.poll(timeout);
            if self.stop_requested() {
                self.teardown();
                break;
            }
            self.process_events();
            self.admit_submissions();
        }
        tracing::debug!(target: "convoy::engine", "worker exited");
    }

    /// Step 1: let the driver make progress on every attached transfer.
    /// The driver loops internally until it has no immediate work left.
    fn drive(&mut self) {
        if let Err(e) = self.multi.perform() {
            tracing::error!(target: "convoy::engine", "driver perform failed: {e}");
        }
    }

    /// Step 2: drain the driver's completion notifications.
    fn harvest_completions(&mut self) {
        let mut done: Vec<(usize, TransportCode, String)> = Vec::new();
        self.multi.messages(|message| {
            let Some(result) = message.result() else {
                return;
            };
            match message.token() {
                Ok(token) => {
                    let (code, description) = match result {
                        Ok(()) => (TransportCode::Ok, String::new()),
                        Err(e) => (TransportCode::from_driver(&e), e.to_string()),
                    };
                    done.push((token, code, description));
                }
                Err(e) => {
                    tracing::error!(target: "convoy::engine", "completion without a token: {e}");
                }
            }
        });
        for (token, code, description) in done {
            self.complete(token, code, description);
        }
    }

    /// Detach an in-flight entry, parking the driver handle back into the
    /// task, and release its permit.
    fn detach(&mut self, entry: InFlight) -> TransferTask {
        let InFlight { driver, mut task } = entry;
        match self.multi.remove2(driver) {
            Ok(easy) => task.easy = Some(easy),
            Err(e) => {
                tracing::error!(target: "convoy::engine", token = task.token, "detach failed: {e}");
            }
        }
        if task.holds_permit {
            self.shared.permits.release();
            task.holds_permit = false;
        }
        task
    }

    fn complete(&mut self, token: usize, code: TransportCode, description: String) {
        let Some(entry) = self.inflight.remove(&token) else {
            debug_assert!(false, "completion for an unknown driver key");
            tracing::error!(target: "convoy::engine", token, "completion for unknown transfer");
            return;
        };
        let mut task = self.detach(entry);

        let mut response = task.finalize_response();
        response.error = description;
        self.track_speeds(&task, &response);
        tracing::debug!(
            target: "convoy::engine",
            token,
            status = response.status,
            code = ?code,
            total_ms = response.info.total.as_millis() as u64,
            "attempt finished"
        );

        if task.retry.is_some() {
            self.complete_with_retry(task, response, code);
        } else {
            task.handle.bump_attempts();
            task.handle.store_state(TransferState::Completed);
            task.promise.fulfill(Ok(response));
        }
    }

    /// Retry decision for a completed attempt of a retry-capable task.
    fn complete_with_retry(
        &mut self,
        mut task: TransferTask,
        response: Response,
        code: TransportCode,
    ) {
        let Some(retry) = task.retry.take() else {
            task.handle.bump_attempts();
            task.handle.store_state(TransferState::Completed);
            task.promise.fulfill(Ok(response));
            return;
        };

        let now = epoch_secs();
        let (eligible, retry_at, attempts) = {
            let mut ctx = retry
                .context
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            ctx.attempts.push(crate::retry::AttemptRecord {
                response: response.clone(),
                code,
                complete_at: now,
            });
            let attempts = ctx.attempt_count();
            task.handle.set_attempts(attempts);

            let wants_retry = (retry.policy.should_retry)(&ctx);
            let under_cap = attempts < retry.policy.max_retries + 1;
            let within_budget = retry.policy.total_timeout == 0.0
                || now - ctx.first_attempt_at < retry.policy.total_timeout;
            let eligible = wants_retry && under_cap && within_budget;
            let retry_at = if eligible {
                (retry.policy.next_retry_at)(&ctx)
            } else {
                0.0
            };
            (eligible, retry_at, attempts)
        };
        task.retry = Some(retry);

        if eligible {
            tracing::debug!(
                target: "convoy::engine",
                token = task.token,
                attempts,
                delay_ms = ((retry_at - now).max(0.0) * 1000.0) as u64,
                "attempt scheduled for retry"
            );
            task.retry_at = retry_at;
            self.retry_seq += 1;
            self.pending_retries.push(PendingRetry {
                at_micros: (retry_at.max(0.0) * 1e6) as u64,
                seq: self.retry_seq,
                task,
            });
        } else {
            task.handle.store_state(TransferState::Completed);
            task.promise.fulfill(Ok(response));
        }
    }

    fn track_speeds(&mut self, task: &TransferTask, response: &Response) {
        let receive = response.info.receive.as_secs_f64();
        let total = response.info.total.as_secs_f64();
        let down_window = if receive > 0.0 { receive } else { total };
        let downlink = if down_window > 0.0 {
            response.body.len() as f64 / down_window
        } else {
            0.0
        };
        let uplink = if total > 0.0 {
            task.request.body_len() as f64 / total
        } else {
            0.0
        };
        self.downlink.push(downlink);
        self.uplink.push(uplink);
        self.shared.speed.publish(&self.uplink, &self.downlink);
    }

    /// Steps 3 and 4: start from the configured poll ceiling, take the
    /// driver's shorter pending timeout when it has one, then promote due
    /// retries while permits allow, lowering the timeout to the earliest
    /// pending retry otherwise.
    fn next_poll_timeout(&mut self) -> Duration {
        let mut timeout = self.shared.config.poll_timeout;
        match self.multi.get_timeout() {
            Ok(Some(driver_timeout)) => timeout = timeout.min(driver_timeout),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(target: "convoy::engine", "driver timeout query failed: {e}");
            }
        }

        let now = epoch_secs();
        while let Some(top) = self.pending_retries.peek() {
            if top.task.retry_at > now {
                // Bound the delta so a pathological schedule cannot
                // overflow the duration conversion.
                let delta = (top.task.retry_at - now).max(0.0).min(86_400.0);
                timeout = timeout.min(Duration::from_secs_f64(delta));
                break;
            }
            if !self.shared.permits.try_acquire() {
                break;
            }
            let Some(mut entry) = self.pending_retries.pop() else {
                self.shared.permits.release();
                break;
            };
            entry.task.holds_permit = true;
            let rearmed = match entry.task.easy.as_mut() {
                Some(easy) => easy::rearm(
                    easy,
                    &entry.task.request,
                    &entry.task.policy,
                    &self.shared.config,
                ),
                None => Err(error::builder_message("driver handle was lost", None)),
            };
            match rearmed {
                Ok(()) => {
                    entry.task.submitted_at = Instant::now();
                    tracing::trace!(
                        target: "convoy::engine",
                        token = entry.task.token,
                        "retry due, re-entering submission queue"
                    );
                    self.shared.lock_mailbox().submissions.push_back(entry.task);
                }
                Err(e) => {
                    self.shared.permits.release();
                    entry.task.holds_permit = false;
                    entry.task.handle.store_state(TransferState::Failed);
                    entry.task.promise.fulfill(Err(e));
                }
            }
        }
        timeout
    }

    /// Step 5: the sole suspension point of the iteration.
    fn poll(&mut self, timeout: Duration) {
        let started = Instant::now();
        let ready = match &self.wake_rx {
            Some(rx) => {
                let mut fd = WaitFd::new();
                fd.set_fd(rx.socket());
                fd.poll_on_read(true);
                let mut fds = [fd];
                self.multi.wait(&mut fds, timeout)
            }
            None => self.multi.wait(&mut [], timeout),
        };
        match ready {
            Ok(0) => {
                // The driver returns early when it has nothing to watch;
                // make up the remainder so an idle engine does not spin.
                let elapsed = started.elapsed();
                if elapsed + Duration::from_millis(1) < timeout {
                    std::thread::sleep(timeout - elapsed);
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(target: "convoy::engine", "driver poll failed: {e}");
                std::thread::sleep(timeout.min(Duration::from_millis(10)));
            }
        }
        if let Some(rx) = &self.wake_rx {
            rx.drain();
        }
    }

    /// Step 6: observe the stop flag.
    fn stop_requested(&self) -> bool {
        self.shared.lock_mailbox().stopped
    }

    /// Fail every promise the engine still owes and exit.
    fn teardown(&mut self) {
        let queued: Vec<TransferTask> = {
            let mut mailbox = self.shared.lock_mailbox();
            mailbox.events.clear();
            mailbox.submissions.drain(..).collect()
        };
        let mut failed = 0usize;

        for mut task in queued {
            if task.holds_permit {
                self.shared.permits.release();
                task.holds_permit = false;
            }
            task.handle.store_state(TransferState::Failed);
            task.promise.fulfill(Err(error::stopped()));
            failed += 1;
        }
        let inflight: Vec<InFlight> = self.inflight.drain().map(|(_, entry)| entry).collect();
        for entry in inflight {
            let task = self.detach(entry);
            task.handle.store_state(TransferState::Failed);
            task.promise.fulfill(Err(error::stopped()));
            failed += 1;
        }
        for entry in std::mem::take(&mut self.pending_retries) {
            entry.task.handle.store_state(TransferState::Failed);
            entry.task.promise.fulfill(Err(error::stopped()));
            failed += 1;
        }
        tracing::debug!(target: "convoy::engine", failed, "engine stopped");
    }

    /// Step 7: act on lifecycle events posted by handles.
    ///
    /// Keys that no longer resolve to an in-flight task are stale: the
    /// transfer completed concurrently or sits parked for retry (where a
    /// pending cancel is honored at promotion or admission time instead).
    fn process_events(&mut self) {
        let events: Vec<usize> = {
            let mut mailbox = self.shared.lock_mailbox();
            mailbox.events.drain(..).collect()
        };
        for token in events {
            let Some(state) = self.inflight.get(&token).map(|entry| entry.task.handle.state())
            else {
                tracing::trace!(target: "convoy::engine", token, "event for a transfer not in flight");
                continue;
            };
            match state {
                TransferState::CancelRequested => self.cancel_task(token),
                TransferState::PauseRequested => self.pause_task(token),
                TransferState::ResumeRequested => self.resume_task(token),
                _ => {}
            }
        }
    }

    fn cancel_task(&mut self, token: usize) {
        let Some(entry) = self.inflight.remove(&token) else {
            return;
        };
        let task = self.detach(entry);
        // The handle stays CancelRequested; the future carries the error.
        task.promise.fulfill(Err(error::cancelled()));
        tracing::debug!(target: "convoy::engine", token, "transfer cancelled");
    }

    fn pause_task(&mut self, token: usize) {
        let Some(entry) = self.inflight.get_mut(&token) else {
            return;
        };
        entry.driver.get_mut().request_pause();
        entry.task.handle.store_state(TransferState::Paused);
        // Pausing frees a concurrency slot for other transfers.
        if entry.task.holds_permit {
            entry.task.holds_permit = false;
            self.shared.permits.release();
        }
        tracing::debug!(target: "convoy::engine", token, "transfer paused");
    }

    fn resume_task(&mut self, token: usize) {
        // A resume must win back a slot first; without one the request is
        // re-posted rather than blocking the worker.
        if !self.shared.permits.try_acquire() {
            self.shared.push_event(token);
            return;
        }
        let Some(entry) = self.inflight.get_mut(&token) else {
            self.shared.permits.release();
            return;
        };
        entry.task.holds_permit = true;
        if let Err(e) = easy::unpause(&mut entry.driver) {
            tracing::error!(target: "convoy::engine", token, "unpause failed: {e}");
        }
        entry.task.handle.store_state(TransferState::Ongoing);
        tracing::debug!(target: "convoy::engine", token, "transfer resumed");
    }

    /// Step 8: attach pending submissions to the driver. The submitter
    /// (or the retry promoter) already holds the permit for each task.
    fn admit_submissions(&mut self) {
        let tasks: Vec<TransferTask> = {
            let mut mailbox = self.shared.lock_mailbox();
            mailbox.submissions.drain(..).collect()
        };
        for mut task in tasks {
            if task.handle.state() == TransferState::CancelRequested {
                if task.holds_permit {
                    self.shared.permits.release();
                    task.holds_permit = false;
                }
                task.promise.fulfill(Err(error::cancelled()));
                continue;
            }
            let token = task.token;
            let Some(mut parked) = task.easy.take() else {
                if task.holds_permit {
                    self.shared.permits.release();
                    task.holds_permit = false;
                }
                task.handle.store_state(TransferState::Failed);
                task.promise
                    .fulfill(Err(error::builder_message("driver handle was lost", None)));
                continue;
            };
            parked.get_mut().arm();
            match self.multi.add2(parked) {
                Ok(mut driver) => {
                    if let Err(e) = driver.set_token(token) {
                        tracing::error!(target: "convoy::engine", token, "token assignment failed: {e}");
                    }
                    task.queue_time = task.submitted_at.elapsed();
                    if let Some(retry) = &task.retry {
                        let mut ctx = retry
                            .context
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        if ctx.first_attempt_at == 0.0 {
                            ctx.first_attempt_at = epoch_secs();
                        }
                    }
                    task.handle
                        .cas_state(TransferState::Pending, TransferState::Ongoing);
                    tracing::trace!(target: "convoy::engine", token, "transfer attached");
                    self.inflight.insert(token, InFlight { driver, task });
                }
                Err(e) => {
                    if task.holds_permit {
                        self.shared.permits.release();
                        task.holds_permit = false;
                    }
                    task.handle.store_state(TransferState::Failed);
                    tracing::error!(target: "convoy::engine", token, "attach failed: {e}");
                    task.promise.fulfill(Err(error::multi(e)));
                }
            }
        }
    }
}
