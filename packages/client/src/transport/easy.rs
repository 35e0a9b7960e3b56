//! Driver handle configuration and post-transfer capture.
//!
//! A parked handle (`Easy2<Collector>`) travels with its task across the
//! submission mailbox; the attached form (`Easy2Handle`) is bound to the
//! multi handle and never leaves the worker thread. These helpers cover
//! both ends: building and re-arming parked handles, unpausing attached
//! ones, and turning a finished attempt into a [`Response`].

use std::time::Duration;

use bytes::Bytes;
use curl::easy::{Easy2, List};
use curl::multi::Easy2Handle;

use super::collector::Collector;
use crate::config::ClientConfig;
use crate::error::{self, Error};
use crate::http::{Request, RequestPolicy, Response, TransferInfo};
use crate::util::epoch_secs;

/// Largest driver I/O buffer a request policy may ask for.
const MAX_BUFFER_SIZE: usize = 512 * 1024;

/// Build and configure a parked handle for `request`.
pub(crate) fn build(
    request: &Request,
    policy: &RequestPolicy,
    config: &ClientConfig,
) -> Result<Easy2<Collector>, Error> {
    let mut easy = Easy2::new(Collector::new());
    configure(&mut easy, request, policy, config)
        .map_err(|e| error::driver(e).with_url(request.url().clone()))?;
    Ok(easy)
}

/// Clear transfer state between attempts while keeping the handle, then
/// reapply the full configuration. Connection reuse survives the reset.
pub(crate) fn rearm(
    easy: &mut Easy2<Collector>,
    request: &Request,
    policy: &RequestPolicy,
    config: &ClientConfig,
) -> Result<(), Error> {
    easy.reset();
    configure(easy, request, policy, config)
        .map_err(|e| error::driver(e).with_url(request.url().clone()))
}

/// Let a cooperatively paused transfer continue.
pub(crate) fn unpause(driver: &mut Easy2Handle<Collector>) -> Result<(), Error> {
    driver.get_mut().clear_pause();
    driver.unpause_read().map_err(error::driver)?;
    driver.unpause_write().map_err(error::driver)
}

/// Capture status, headers, body and the timing breakdown of the attempt
/// that just finished on a parked handle.
pub(crate) fn finalize(easy: &mut Easy2<Collector>, queue: Duration) -> Response {
    let status = easy.response_code().unwrap_or(0) as u16;
    // connect_time includes name resolution, matching the driver's
    // cumulative counters.
    let connect = easy.connect_time().unwrap_or_default();
    let appconnect = easy.appconnect_time().unwrap_or_default();
    let pretransfer = easy.pretransfer_time().unwrap_or_default();
    let starttransfer = easy.starttransfer_time().unwrap_or_default();
    let total = easy.total_time().unwrap_or_default();
    let redirect = easy.redirect_time().unwrap_or_default();

    let collector = easy.get_mut();
    let info = TransferInfo {
        start_at: collector.start_epoch(),
        queue,
        connect,
        tls_handshake: appconnect.saturating_sub(connect),
        pre_transfer: pretransfer.saturating_sub(appconnect.max(connect)),
        // The driver has no counter separating request transmission from
        // server latency; the whole window lands in start_transfer.
        request_send: Duration::ZERO,
        start_transfer: starttransfer.saturating_sub(pretransfer),
        ttfb: collector.ttfb(),
        receive: total.saturating_sub(starttransfer),
        total,
        redirect,
        complete_at: epoch_secs(),
    };

    Response {
        status,
        headers: collector.take_headers(),
        body: Bytes::from(collector.take_body()),
        error: String::new(),
        info,
    }
}

/// Apply pool defaults, per-request policy and method framing to a handle.
fn configure(
    easy: &mut Easy2<Collector>,
    request: &Request,
    policy: &RequestPolicy,
    _config: &ClientConfig,
) -> Result<(), curl::Error> {
    // Pool defaults: reuse connections, keep them alive, follow redirects.
    easy.follow_location(true)?;
    easy.tcp_keepalive(true)?;
    easy.forbid_reuse(false)?;

    easy.url(request.url().as_str())?;

    if let Some(timeout) = policy.timeout {
        easy.timeout(timeout)?;
    }
    if let Some(timeout) = policy.connect_timeout {
        easy.connect_timeout(timeout)?;
    }
    if policy.send_speed_limit > 0 {
        easy.max_send_speed(policy.send_speed_limit)?;
    }
    if policy.recv_speed_limit > 0 {
        easy.max_recv_speed(policy.recv_speed_limit)?;
    }
    if policy.low_speed_limit > 0 {
        if let Some(period) = policy.low_speed_time {
            easy.low_speed_limit(policy.low_speed_limit)?;
            easy.low_speed_time(period)?;
        }
    }
    if policy.buffer_size > 0 {
        easy.buffer_size(policy.buffer_size.clamp(1024, MAX_BUFFER_SIZE))?;
    }

    let mut headers = List::new();
    for line in request.header_lines() {
        headers.append(&line)?;
    }
    easy.http_headers(headers)?;

    // GET and HEAD force no request body; POST sends the body with its
    // declared length; everything else passes the method name through.
    match request.method().as_str() {
        "HEAD" => {
            easy.nobody(true)?;
        }
        "GET" => {
            easy.get(true)?;
        }
        "POST" => {
            let body = request.body().map(Bytes::as_ref).unwrap_or_default();
            easy.post(true)?;
            easy.post_fields_copy(body)?;
            easy.post_field_size(body.len() as u64)?;
        }
        name => {
            if let Some(body) = request.body() {
                easy.post_fields_copy(body)?;
                easy.post_field_size(body.len() as u64)?;
            }
            easy.custom_request(name)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::default()
    }

    #[test]
    fn builds_a_handle_for_a_valid_request() {
        let request = Request::get("http://127.0.0.1:1/never-contacted");
        assert!(build(&request, &RequestPolicy::default(), &config()).is_ok());
    }

    #[test]
    fn configures_bodies_for_custom_methods() {
        let request =
            Request::with_method_name("report", "http://127.0.0.1:1/x").body_text("payload");
        assert!(build(&request, &RequestPolicy::default(), &config()).is_ok());
    }

    #[test]
    fn rearm_after_construction_succeeds() {
        let request = Request::get("http://127.0.0.1:1/x");
        let policy = RequestPolicy::default().with_timeout(Duration::from_secs(2));
        let mut easy = build(&request, &policy, &config()).expect("handle builds");
        assert!(rearm(&mut easy, &request, &policy, &config()).is_ok());
    }

    #[test]
    fn finalize_without_an_attempt_yields_an_empty_response() {
        let request = Request::get("http://127.0.0.1:1/x");
        let mut easy =
            build(&request, &RequestPolicy::default(), &config()).expect("handle builds");
        let response = finalize(&mut easy, Duration::ZERO);
        assert_eq!(response.status, 0);
        assert!(response.body.is_empty());
        assert!(response.headers.is_empty());
    }
}
