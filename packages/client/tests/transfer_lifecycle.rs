//! End-to-end lifecycle tests against a scripted local server.

mod support;

use std::thread;
use std::time::{Duration, Instant};

use convoy_client::{HttpClient, Request, RequestPolicy, TransferState};

use support::{read_request, respond, respond_with_headers, serve, wait_until};

#[test]
fn simple_get_resolves_with_body_and_timings() {
    support::init_logging();
    let addr = serve(|_, mut stream| {
        let request = read_request(&mut stream);
        assert_eq!(request.method(), "GET");
        respond(&mut stream, 200, "OK", b"hello world");
    });

    let client = HttpClient::new().expect("client starts");
    let handle = client
        .submit(
            Request::get(&format!("http://{addr}/get")),
            RequestPolicy::default(),
        )
        .expect("submit accepts the request");

    let response = handle.wait().expect("transfer resolves");
    assert_eq!(response.status, 200);
    assert_eq!(response.body_text(), "hello world");
    assert!(response.error.is_empty());
    assert!(response.info.total > Duration::ZERO);
    assert!(response.info.complete_at >= response.info.start_at);
    assert_eq!(handle.attempt_count(), 1);
    assert!(!handle.has_retry());
    assert_eq!(handle.state(), TransferState::Completed);
}

#[test]
fn response_headers_are_verbatim_without_status_lines() {
    support::init_logging();
    let addr = serve(|_, mut stream| {
        let _ = read_request(&mut stream);
        respond_with_headers(&mut stream, 200, "OK", &["X-Custom: abc"], b"ok");
    });

    let client = HttpClient::new().expect("client starts");
    let response = client
        .await_request(
            Request::get(&format!("http://{addr}/headers")),
            RequestPolicy::default(),
        )
        .expect("transfer resolves");

    assert_eq!(response.header("x-custom"), Some("abc"));
    assert!(response
        .headers
        .iter()
        .all(|line| !line.starts_with("HTTP/")));
}

#[test]
fn post_sends_the_body_with_declared_length() {
    support::init_logging();
    let addr = serve(|_, mut stream| {
        let request = read_request(&mut stream);
        assert_eq!(request.method(), "POST");
        let body = request.body.clone();
        respond(&mut stream, 200, "OK", &body);
    });

    let client = HttpClient::new().expect("client starts");
    let response = client
        .await_request(
            Request::post(&format!("http://{addr}/echo")).body_text("payload-123"),
            RequestPolicy::default(),
        )
        .expect("transfer resolves");

    assert_eq!(response.status, 200);
    assert_eq!(response.body_text(), "payload-123");
}

#[test]
fn cancel_mid_flight_fails_the_future_and_frees_the_slot() {
    support::init_logging();
    let slow = serve(|_, mut stream| {
        let _ = read_request(&mut stream);
        thread::sleep(Duration::from_secs(8));
        respond(&mut stream, 200, "OK", b"too late");
    });
    let quick = serve(|_, mut stream| {
        let _ = read_request(&mut stream);
        respond(&mut stream, 200, "OK", b"ok");
    });

    // One slot total, so the cancelled transfer must give its permit back.
    let client = HttpClient::with_config(
        convoy_client::ClientConfig::default().with_max_connections(1),
    )
    .expect("client starts");

    let handle = client
        .submit(
            Request::get(&format!("http://{slow}/delay")),
            RequestPolicy::default(),
        )
        .expect("submit accepts the request");

    thread::sleep(Duration::from_millis(400));
    handle.cancel();
    handle.cancel(); // idempotent

    let outcome = handle
        .future()
        .wait_timeout(Duration::from_secs(3))
        .expect("cancel resolves the future promptly");
    let err = outcome.expect_err("cancelled transfers fail their future");
    assert!(err.is_cancelled(), "unexpected error: {err}");
    assert_eq!(handle.state(), TransferState::CancelRequested);

    // The freed permit lets another transfer through immediately.
    let response = client
        .await_request(
            Request::get(&format!("http://{quick}/after")),
            RequestPolicy::default(),
        )
        .expect("pool has a free slot again");
    assert_eq!(response.status, 200);
}

#[test]
fn terminal_states_never_transition_again() {
    support::init_logging();
    let addr = serve(|_, mut stream| {
        let _ = read_request(&mut stream);
        respond(&mut stream, 200, "OK", b"done");
    });

    let client = HttpClient::new().expect("client starts");
    let handle = client
        .submit(
            Request::get(&format!("http://{addr}/one")),
            RequestPolicy::default(),
        )
        .expect("submit accepts the request");
    handle.wait().expect("transfer resolves");

    assert_eq!(handle.state(), TransferState::Completed);
    handle.pause();
    handle.resume();
    handle.cancel();
    assert_eq!(handle.state(), TransferState::Completed);
    // The resolved future keeps returning the same response.
    let again = handle.wait().expect("future stays resolved");
    assert_eq!(again.status, 200);
}

#[test]
fn invalid_urls_fail_at_submit_time() {
    support::init_logging();
    let client = HttpClient::new().expect("client starts");
    let err = client
        .submit(Request::get("definitely not a url"), RequestPolicy::default())
        .expect_err("malformed URLs are rejected");
    assert!(err.is_builder(), "unexpected error: {err}");
}

#[test]
fn stop_fails_inflight_transfers_and_later_submissions() {
    support::init_logging();
    let addr = serve(|_, mut stream| {
        let _ = read_request(&mut stream);
        thread::sleep(Duration::from_secs(8));
        respond(&mut stream, 200, "OK", b"too late");
    });

    let client = HttpClient::new().expect("client starts");
    let handle = client
        .submit(
            Request::get(&format!("http://{addr}/slow")),
            RequestPolicy::default(),
        )
        .expect("submit accepts the request");

    // Let the transfer attach before stopping.
    assert!(wait_until(Duration::from_secs(2), || {
        handle.state() == TransferState::Ongoing
    }));

    client.stop();

    let err = handle.wait().expect_err("stopped engines fail their transfers");
    assert!(err.is_stopped(), "unexpected error: {err}");
    assert_eq!(handle.state(), TransferState::Failed);

    let err = client
        .submit(
            Request::get(&format!("http://{addr}/again")),
            RequestPolicy::default(),
        )
        .expect_err("submission after stop is rejected");
    assert!(err.is_stopped());
}

#[test]
fn pause_and_resume_preserve_the_body() {
    support::init_logging();
    // 1000 bytes trickled in 10 chunks, roughly 1.5 seconds end to end.
    let addr = serve(|_, mut stream| {
        use std::io::Write;
        let _ = read_request(&mut stream);
        let head =
            "HTTP/1.1 200 OK\r\nContent-Length: 1000\r\nConnection: close\r\n\r\n".to_string();
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.flush();
        for _ in 0..10 {
            let _ = stream.write_all(&[0x42u8; 100]);
            let _ = stream.flush();
            thread::sleep(Duration::from_millis(150));
        }
    });

    let client = HttpClient::new().expect("client starts");
    let handle = client
        .submit(
            Request::get(&format!("http://{addr}/trickle")),
            RequestPolicy::default(),
        )
        .expect("submit accepts the request");

    assert!(wait_until(Duration::from_secs(2), || {
        handle.state() == TransferState::Ongoing
    }));
    thread::sleep(Duration::from_millis(300));

    handle.pause();
    assert!(
        wait_until(Duration::from_secs(2), || handle.state()
            == TransferState::Paused),
        "pause was not observed within the poll quantum"
    );

    thread::sleep(Duration::from_millis(500));
    handle.resume();
    assert!(wait_until(Duration::from_secs(2), || {
        matches!(
            handle.state(),
            TransferState::Ongoing | TransferState::Completed
        )
    }));

    let response = handle
        .future()
        .wait_timeout(Duration::from_secs(30))
        .expect("paused-and-resumed transfer still completes")
        .expect("transfer resolves");
    assert_eq!(response.status, 200);
    assert_eq!(response.body.len(), 1000);
    assert_eq!(handle.state(), TransferState::Completed);
}

#[test]
fn queue_time_covers_the_wait_for_a_slot() {
    support::init_logging();
    let addr = serve(|_, mut stream| {
        let _ = read_request(&mut stream);
        thread::sleep(Duration::from_millis(400));
        respond(&mut stream, 200, "OK", b"slow-ish");
    });

    let client = HttpClient::with_config(
        convoy_client::ClientConfig::default().with_max_connections(1),
    )
    .expect("client starts");

    let first = client
        .submit(
            Request::get(&format!("http://{addr}/a")),
            RequestPolicy::default(),
        )
        .expect("first submit");
    let started = Instant::now();
    let second = client
        .submit(
            Request::get(&format!("http://{addr}/b")),
            RequestPolicy::default(),
        )
        .expect("second submit");
    // The second submit had to wait for the only slot.
    assert!(started.elapsed() >= Duration::from_millis(200));

    assert_eq!(first.wait().expect("first resolves").status, 200);
    assert_eq!(second.wait().expect("second resolves").status, 200);
}
