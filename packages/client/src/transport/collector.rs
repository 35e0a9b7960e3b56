//! Driver-side ingestion callbacks for one transfer.

use std::time::{Duration, Instant};

use curl::easy::{Handler, WriteError};

use crate::util::epoch_secs;

/// Accumulates the response of a single attempt.
///
/// Installed as the driver handle's callback target. Body chunks are
/// appended with a one-time reservation once Content-Length is known;
/// header lines are captured verbatim except for HTTP status lines. The
/// first body byte records time-to-first-byte against the attempt start.
///
/// All callbacks run on the engine's worker thread, which is also the only
/// thread touching the pause flag, so plain fields suffice.
#[derive(Debug)]
pub(crate) struct Collector {
    body: Vec<u8>,
    headers: Vec<String>,
    content_length: Option<usize>,
    started: Option<Instant>,
    start_epoch: f64,
    ttfb: Option<Duration>,
    pause_requested: bool,
}

impl Collector {
    pub(crate) fn new() -> Self {
        Self {
            body: Vec::new(),
            headers: Vec::new(),
            content_length: None,
            started: None,
            start_epoch: 0.0,
            ttfb: None,
            pause_requested: false,
        }
    }

    /// Reset per-attempt state and stamp the attempt start.
    pub(crate) fn arm(&mut self) {
        self.body.clear();
        self.headers.clear();
        self.content_length = None;
        self.started = Some(Instant::now());
        self.start_epoch = epoch_secs();
        self.ttfb = None;
        self.pause_requested = false;
    }

    /// Ask the next write callback to pause the transfer.
    pub(crate) fn request_pause(&mut self) {
        self.pause_requested = true;
    }

    /// Allow writes to proceed again.
    pub(crate) fn clear_pause(&mut self) {
        self.pause_requested = false;
    }

    pub(crate) fn start_epoch(&self) -> f64 {
        self.start_epoch
    }

    pub(crate) fn ttfb(&self) -> Duration {
        self.ttfb.unwrap_or_default()
    }

    pub(crate) fn take_body(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.body)
    }

    pub(crate) fn take_headers(&mut self) -> Vec<String> {
        std::mem::take(&mut self.headers)
    }
}

impl Handler for Collector {
    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if self.pause_requested {
            // The driver retains this chunk and redelivers it on unpause.
            return Err(WriteError::Pause);
        }
        if self.ttfb.is_none() {
            self.ttfb = self.started.map(|t| t.elapsed());
        }
        if let Some(len) = self.content_length {
            if self.body.capacity() < len {
                self.body.reserve(len - self.body.len());
            }
        }
        self.body.extend_from_slice(data);
        Ok(data.len())
    }

    fn header(&mut self, data: &[u8]) -> bool {
        let line = String::from_utf8_lossy(data);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() || line.starts_with("HTTP/") {
            return true;
        }

        if let Some(value) = strip_header_prefix(line, "content-length") {
            self.content_length = value.parse().ok();
        }
        self.headers.push(line.to_string());
        true
    }
}

/// `"Name: value"` to `Some("value")` when the name matches, ignoring case.
fn strip_header_prefix<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (candidate, value) = line.split_once(':')?;
    if candidate.trim().eq_ignore_ascii_case(name) {
        Some(value.trim())
    } else {
        None
    }
}
