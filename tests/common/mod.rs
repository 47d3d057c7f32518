//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by the mock server.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What the mock server answers.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub delay: Duration,
    pub keep_alive: bool,
    pub send_content_length: bool,
}

impl MockResponse {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
            delay: Duration::ZERO,
            keep_alive: false,
            send_content_length: true,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn keep_alive(mut self) -> Self {
        self.keep_alive = true;
        self
    }

    /// Delimit the body by closing the connection instead.
    pub fn without_content_length(mut self) -> Self {
        self.send_content_length = false;
        self
    }
}

/// Handle to a running mock server.
#[derive(Clone)]
pub struct MockServer {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// TCP connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a mock server that answers every request with `respond(request)`.
pub async fn start_mock<F>(respond: F) -> MockServer
where
    F: Fn(&CapturedRequest) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = MockServer {
        addr,
        connections: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let respond = Arc::new(respond);
    let state = server.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            state.connections.fetch_add(1, Ordering::SeqCst);
            let respond = respond.clone();
            let requests = state.requests.clone();
            tokio::spawn(async move {
                let _ = serve_connection(socket, respond, requests).await;
            });
        }
    });

    server
}

/// Start a mock server answering with a fixed response.
pub async fn start_fixed(response: MockResponse) -> MockServer {
    start_mock(move |_| response.clone()).await
}

/// Start a server that reads each request and hangs up without answering.
pub async fn start_hangup() -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = MockServer {
        addr: listener.local_addr().unwrap(),
        connections: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let state = server.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            state.connections.fetch_add(1, Ordering::SeqCst);
            let requests = state.requests.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                if let Ok(Some(request)) = read_request(&mut socket, &mut buf).await {
                    requests.lock().unwrap().push(request);
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    server
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn serve_connection<F>(
    mut socket: TcpStream,
    respond: Arc<F>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
) -> std::io::Result<()>
where
    F: Fn(&CapturedRequest) -> MockResponse + Send + Sync + 'static,
{
    let mut buf = Vec::new();
    loop {
        let Some(request) = read_request(&mut socket, &mut buf).await? else {
            return Ok(());
        };
        requests.lock().unwrap().push(request.clone());

        let response = respond(&request);
        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }

        let close = !response.keep_alive || !response.send_content_length;
        let mut head = format!("HTTP/1.1 {} {}\r\n", response.status, reason(response.status));
        for (k, v) in &response.headers {
            head.push_str(&format!("{}: {}\r\n", k, v));
        }
        let has_explicit_length = response
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("content-length"));
        if response.send_content_length && !has_explicit_length {
            head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
        }
        if close {
            head.push_str("Connection: close\r\n");
        }
        head.push_str("\r\n");

        socket.write_all(head.as_bytes()).await?;
        if request.method != "HEAD" {
            socket.write_all(&response.body).await?;
        }
        socket.flush().await?;

        if close {
            socket.shutdown().await?;
            return Ok(());
        }
    }
}

async fn read_request(
    socket: &mut TcpStream,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<CapturedRequest>> {
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = head_end + 4;
    while buf.len() < body_start + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = buf[body_start..body_start + content_length].to_vec();
    buf.drain(..body_start + content_length);

    Ok(Some(CapturedRequest {
        method,
        target,
        headers,
        body,
    }))
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        302 => "Found",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
