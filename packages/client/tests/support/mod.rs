//! Scripted local HTTP server for integration tests.
//!
//! Each connection is handed to the test's handler together with its
//! ordinal, so scripts like "503 twice, then 200" are one closure. All
//! responses close the connection, keeping one request per connection.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Once;
use std::thread;
use std::time::Duration;

static INIT_LOGGING: Once = Once::new();

/// Route test logs through tracing when RUST_LOG asks for them.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Minimal parsed request: the request line plus raw header text.
pub struct ParsedRequest {
    pub request_line: String,
    pub headers: String,
    pub body: Vec<u8>,
}

impl ParsedRequest {
    pub fn method(&self) -> &str {
        self.request_line.split(' ').next().unwrap_or_default()
    }
}

/// Read one HTTP request, honoring Content-Length for the body.
pub fn read_request(stream: &mut TcpStream) -> ParsedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        match stream.read(&mut chunk) {
            Ok(0) => break buf.len(),
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = find_header_end(&buf) {
                    break pos;
                }
            }
            Err(_) => break buf.len(),
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let (request_line, headers) = head
        .split_once("\r\n")
        .map(|(line, rest)| (line.to_string(), rest.to_string()))
        .unwrap_or((head.clone(), String::new()));

    let content_length = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);

    let mut body: Vec<u8> = buf[(header_end + 4).min(buf.len())..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&chunk[..n]),
        }
    }
    body.truncate(content_length);

    ParsedRequest {
        request_line,
        headers,
        body,
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Write a complete response and close the connection.
pub fn respond(stream: &mut TcpStream, status: u16, reason: &str, body: &[u8]) {
    respond_with_headers(stream, status, reason, &[], body);
}

/// Write a complete response with extra header lines.
pub fn respond_with_headers(
    stream: &mut TcpStream,
    status: u16,
    reason: &str,
    extra_headers: &[&str],
    body: &[u8],
) {
    let mut head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n",
        body.len()
    );
    for line in extra_headers {
        head.push_str(line);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

/// Spawn a server that passes each accepted connection, with its ordinal,
/// to `handler`. The accept thread is detached; it dies with the process.
pub fn serve<F>(handler: F) -> SocketAddr
where
    F: Fn(usize, TcpStream) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
    let addr = listener.local_addr().expect("test server address");
    thread::spawn(move || {
        let handler = std::sync::Arc::new(handler);
        for (index, stream) in listener.incoming().enumerate() {
            let Ok(stream) = stream else { break };
            let handler = std::sync::Arc::clone(&handler);
            thread::spawn(move || handler(index, stream));
        }
    });
    addr
}

/// A bound-then-dropped port: connections to it are refused.
pub fn refused_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    addr
}

/// Poll `predicate` until it holds or `deadline` elapses.
pub fn wait_until(deadline: Duration, predicate: impl Fn() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    predicate()
}
