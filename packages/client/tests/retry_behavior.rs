//! Retry state machine tests: policy-driven re-attempts, exhaustion and
//! the total-timeout budget.

mod support;

use std::time::{Duration, Instant};

use convoy_client::retry::strategies;
use convoy_client::{HttpClient, Request, RequestPolicy, RetryPolicy, TransportCode};

use support::{read_request, refused_port, respond, serve};

fn status_retry_policy(max_retries: u32, delay: f64) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_retries(max_retries)
        .with_condition(strategies::http_status_condition([500, 502, 503, 504]))
        .with_backoff(strategies::fixed_delay(delay))
}

#[test]
fn retries_until_the_server_recovers() {
    support::init_logging();
    // 503 twice, then 200.
    let addr = serve(|index, mut stream| {
        let _ = read_request(&mut stream);
        if index < 2 {
            respond(&mut stream, 503, "Service Unavailable", b"try later");
        } else {
            respond(&mut stream, 200, "OK", b"recovered");
        }
    });

    let client = HttpClient::new().expect("client starts");
    let started = Instant::now();
    let handle = client
        .submit_with_retry(
            Request::get(&format!("http://{addr}/flaky")),
            RequestPolicy::default(),
            status_retry_policy(3, 0.5),
        )
        .expect("submit accepts the request");

    let response = handle.wait().expect("transfer resolves");
    assert_eq!(response.status, 200);
    assert_eq!(response.body_text(), "recovered");
    assert_eq!(handle.attempt_count(), 3);
    assert!(handle.has_retry());
    // Two backoff gaps of 0.5 s each sit between the three attempts.
    assert!(
        started.elapsed() >= Duration::from_millis(900),
        "attempts were not spaced by the backoff: {:?}",
        started.elapsed()
    );

    let context = handle.retry_context().expect("retry bookkeeping exists");
    let statuses: Vec<u16> = context
        .attempts
        .iter()
        .map(|attempt| attempt.response.status)
        .collect();
    assert_eq!(statuses, vec![503, 503, 200]);
    assert!(context
        .attempts
        .iter()
        .all(|attempt| attempt.code == TransportCode::Ok));
    assert!(context.first_attempt_at > 0.0);
}

#[test]
fn exhausted_retries_resolve_with_the_final_response() {
    support::init_logging();
    let addr = serve(|_, mut stream| {
        let _ = read_request(&mut stream);
        respond(&mut stream, 503, "Service Unavailable", b"still down");
    });

    let client = HttpClient::new().expect("client starts");
    let handle = client
        .submit_with_retry(
            Request::get(&format!("http://{addr}/down")),
            RequestPolicy::default(),
            status_retry_policy(2, 0.1),
        )
        .expect("submit accepts the request");

    // Exhaustion is not an error: the final 503 comes back as a response.
    let response = handle.wait().expect("exhausted retries still resolve");
    assert_eq!(response.status, 503);
    assert_eq!(handle.attempt_count(), 3);
}

#[test]
fn total_timeout_bounds_the_multi_attempt_budget() {
    support::init_logging();
    let addr = refused_port();

    let policy = RetryPolicy::default()
        .with_max_retries(10)
        .with_condition(strategies::default_condition())
        .with_backoff(strategies::fixed_delay(1.0))
        .with_total_timeout(2.0);

    let client = HttpClient::new().expect("client starts");
    let started = Instant::now();
    let handle = client
        .submit_with_retry(
            Request::get(&format!("http://{addr}/refused")),
            RequestPolicy::default(),
            policy,
        )
        .expect("submit accepts the request");

    let response = handle.wait().expect("budget exhaustion still resolves");
    let elapsed = started.elapsed();

    assert!(response.is_transport_error());
    assert_eq!(response.status, 0);
    assert!(!response.error.is_empty());
    assert!(
        (2..=3).contains(&handle.attempt_count()),
        "unexpected attempt count {}",
        handle.attempt_count()
    );
    // Budget plus at most one attempt and a poll quantum.
    assert!(
        elapsed <= Duration::from_secs(4),
        "budget overshot: {elapsed:?}"
    );

    let context = handle.retry_context().expect("retry bookkeeping exists");
    assert!(context
        .attempts
        .iter()
        .all(|attempt| attempt.code == TransportCode::Connect));
}

#[test]
fn transport_failures_retry_under_the_default_condition() {
    support::init_logging();
    let addr = refused_port();

    let policy = RetryPolicy::default()
        .with_max_retries(2)
        .with_condition(strategies::default_condition())
        .with_backoff(strategies::immediate());

    let client = HttpClient::new().expect("client starts");
    let handle = client
        .submit_with_retry(
            Request::get(&format!("http://{addr}/refused")),
            RequestPolicy::default(),
            policy,
        )
        .expect("submit accepts the request");

    let response = handle.wait().expect("transfer resolves");
    assert!(response.is_transport_error());
    assert_eq!(handle.attempt_count(), 3);
}

#[test]
fn non_matching_statuses_do_not_retry() {
    support::init_logging();
    let addr = serve(|_, mut stream| {
        let _ = read_request(&mut stream);
        respond(&mut stream, 404, "Not Found", b"nope");
    });

    let client = HttpClient::new().expect("client starts");
    let handle = client
        .submit_with_retry(
            Request::get(&format!("http://{addr}/missing")),
            RequestPolicy::default(),
            status_retry_policy(3, 0.1),
        )
        .expect("submit accepts the request");

    let response = handle.wait().expect("transfer resolves");
    assert_eq!(response.status, 404);
    assert_eq!(handle.attempt_count(), 1);
}
