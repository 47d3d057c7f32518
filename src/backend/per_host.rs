//! Per-host backend.
//!
//! # Responsibilities
//! - One client per (host, port, scheme, connection options) from the direct registry
//! - Bounded set of HTTP/1.1 keep-alive connections per client
//! - Optional TLS, HTTP proxy (absolute-form) and CONNECT tunnel for https
//! - IPv4-only dialing when IPv6 is disabled
//!
//! # Design Decisions
//! - Connect timeout covers TCP connect, tunnel and TLS handshake
//! - Network timeout bounds sending and reading the body, each separately
//! - No retry: a failed send is reported as-is

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1::{self, SendRequest};
use hyper::header::{HeaderMap, HeaderValue, CONNECTION, CONTENT_LENGTH, HOST};
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::backend::{build_header_map, Backend, MethodPlan, Target};
use crate::error::{ClientError, ClientResult};
use crate::http::{BackendOutcome, HttpRequest, ProxyEndpoint, ResponseHeaders};
use crate::pool::{DirectKey, PoolRegistry};

const MAX_TUNNEL_HEAD: usize = 8 * 1024;

trait Io: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> Io for T {}

type Sender = SendRequest<Full<Bytes>>;

/// Raw reply from a per-host client.
#[derive(Debug)]
pub struct HostReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// HTTP/1.1 client bound to a single host and scheme.
pub struct HostClient {
    host: String,
    port: u16,
    tls: Option<tokio_native_tls::TlsConnector>,
    proxy: Option<ProxyEndpoint>,
    disable_ipv6: bool,
    connect_timeout: Duration,
    network_timeout: Duration,
    permits: Semaphore,
    idle: Mutex<Vec<Sender>>,
    opened: AtomicUsize,
}

impl std::fmt::Debug for HostClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostClient")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls.is_some())
            .field("proxy", &self.proxy)
            .field("opened", &self.opened())
            .finish()
    }
}

impl HostClient {
    /// Build a client for everything a direct key describes.
    pub fn new(key: &DirectKey) -> ClientResult<Self> {
        let tls = if key.tls {
            let connector = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(key.insecure)
                .danger_accept_invalid_hostnames(key.insecure)
                .build()?;
            Some(tokio_native_tls::TlsConnector::from(connector))
        } else {
            None
        };

        Ok(Self {
            host: key.host.clone(),
            port: key.port,
            tls,
            proxy: key.proxy.clone(),
            disable_ipv6: key.disable_ipv6,
            connect_timeout: Duration::from_millis(key.connect_timeout_ms as u64),
            network_timeout: Duration::from_millis(key.network_timeout_ms as u64),
            permits: Semaphore::new(key.concurrency.clamp(1, Semaphore::MAX_PERMITS)),
            idle: Mutex::new(Vec::new()),
            opened: AtomicUsize::new(0),
        })
    }

    /// Number of connections dialed so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }

    /// Number of keep-alive connections waiting for reuse.
    pub fn idle_connections(&self) -> usize {
        self.idle.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Send one request and read the whole body.
    pub async fn send(&self, request: hyper::Request<Full<Bytes>>) -> ClientResult<HostReply> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ClientError::Connect(std::io::Error::other("connection limiter closed")))?;

        let mut sender = self.checkout().await?;

        let response = timeout(self.network_timeout, sender.send_request(request))
            .await
            .map_err(|_| ClientError::NetworkTimeout(self.network_timeout))?
            .map_err(|e| {
                if e.is_incomplete_message() {
                    ClientError::NoResponse
                } else {
                    ClientError::Http(e)
                }
            })?;
        tokio::task::yield_now().await;

        let (parts, body) = response.into_parts();
        let body = timeout(self.network_timeout, body.collect())
            .await
            .map_err(|_| ClientError::NetworkTimeout(self.network_timeout))??
            .to_bytes();
        tokio::task::yield_now().await;

        if !wants_close(&parts.headers) && !sender.is_closed() {
            self.idle.lock().unwrap_or_else(|e| e.into_inner()).push(sender);
        }

        Ok(HostReply {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    fn pop_idle(&self) -> Option<Sender> {
        self.idle.lock().unwrap_or_else(|e| e.into_inner()).pop()
    }

    async fn checkout(&self) -> ClientResult<Sender> {
        while let Some(mut sender) = self.pop_idle() {
            if sender.is_closed() {
                continue;
            }
            if sender.ready().await.is_ok() {
                return Ok(sender);
            }
        }
        self.connect().await
    }

    async fn connect(&self) -> ClientResult<Sender> {
        let io = timeout(self.connect_timeout, self.open_stream())
            .await
            .map_err(|_| ClientError::ConnectTimeout(self.connect_timeout))??;

        let (sender, connection) = http1::handshake::<_, Full<Bytes>>(TokioIo::new(io)).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(error = %e, "Per-host connection closed with error");
            }
        });

        let opened = self.opened.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(host = %self.host, port = self.port, opened, "Opened connection");
        Ok(sender)
    }

    async fn open_stream(&self) -> ClientResult<Box<dyn Io>> {
        let (dial_host, dial_port) = match &self.proxy {
            Some(p) => (p.host.as_str(), p.port),
            None => (self.host.as_str(), self.port),
        };

        let addrs = self.resolve(dial_host, dial_port).await?;
        let stream = dial(&addrs).await?;

        let io: Box<dyn Io> = match (&self.tls, &self.proxy) {
            (Some(tls), Some(_)) => {
                let stream = self.tunnel(stream).await?;
                Box::new(tls.connect(&self.host, stream).await?)
            }
            (Some(tls), None) => Box::new(tls.connect(&self.host, stream).await?),
            (None, _) => Box::new(stream),
        };
        Ok(io)
    }

    async fn resolve(&self, host: &str, port: u16) -> ClientResult<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| ClientError::Dns {
                host: host.to_string(),
                reason: e.to_string(),
            })?
            .filter(|a| !self.disable_ipv6 || a.is_ipv4())
            .collect();

        if addrs.is_empty() {
            return Err(ClientError::Dns {
                host: host.to_string(),
                reason: "no usable address".to_string(),
            });
        }
        Ok(addrs)
    }

    /// Open a CONNECT tunnel through the proxy to the target host.
    async fn tunnel(&self, mut stream: TcpStream) -> ClientResult<TcpStream> {
        let authority = if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        };
        let head = format!("CONNECT {0} HTTP/1.1\r\nHost: {0}\r\n\r\n", authority);
        stream.write_all(head.as_bytes()).await.map_err(ClientError::Connect)?;

        let mut buf = Vec::with_capacity(512);
        let mut chunk = [0u8; 512];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            if buf.len() > MAX_TUNNEL_HEAD {
                return Err(ClientError::ProxyTunnel("CONNECT response head too large".into()));
            }
            let n = stream.read(&mut chunk).await.map_err(ClientError::Connect)?;
            if n == 0 {
                return Err(ClientError::ProxyTunnel("proxy closed connection during CONNECT".into()));
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let head = String::from_utf8_lossy(&buf);
        let status_line = head.lines().next().unwrap_or_default();
        if status_line.split_whitespace().nth(1) != Some("200") {
            return Err(ClientError::ProxyTunnel(format!("proxy answered '{}'", status_line)));
        }
        Ok(stream)
    }
}

async fn dial(addrs: &[SocketAddr]) -> ClientResult<TcpStream> {
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                let _ = stream.set_nodelay(true);
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!(addr = %addr, error = %e, "Connect attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(ClientError::Connect(
        last_err.unwrap_or_else(|| std::io::Error::other("no address to dial")),
    ))
}

fn wants_close(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("close")))
}

/// Backend A: executes requests through per-host clients.
#[derive(Debug)]
pub struct PerHostBackend {
    pool: PoolRegistry<DirectKey, HostClient>,
}

impl PerHostBackend {
    pub fn new(max_pools: usize) -> Self {
        Self {
            pool: PoolRegistry::new("direct", max_pools),
        }
    }

    pub fn pool(&self) -> &PoolRegistry<DirectKey, HostClient> {
        &self.pool
    }

    pub async fn execute(&self, request: &HttpRequest) -> ClientResult<BackendOutcome> {
        let plan = Backend::PerHost.method_plan(request.method.as_deref(), request.has_body())?;
        let target = Target::parse(&request.uri)?;

        let key = DirectKey::new(&target, request);
        tracing::debug!(key = %key, "Get pool");
        let client = self.pool.get_or_create(&key, || HostClient::new(&key)).await?;

        let http_request = build_request(&target, &plan, request, client.proxy.is_some())?;

        let started = Instant::now();
        let reply = client.send(http_request).await?;
        tracing::debug!(
            status = reply.status.as_u16(),
            ms = started.elapsed().as_millis() as u64,
            "Http done"
        );

        let reported = reply
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        Ok(BackendOutcome {
            status_code: reply.status.as_u16(),
            content_length: BackendOutcome::resolve_content_length(reported, &reply.body),
            headers: ResponseHeaders::from(&reply.headers),
            body: reply.body,
        })
    }
}

fn build_request(
    target: &Target,
    plan: &MethodPlan,
    request: &HttpRequest,
    via_proxy: bool,
) -> ClientResult<hyper::Request<Full<Bytes>>> {
    // Plain HTTP through a proxy uses absolute-form; tunnels use origin-form.
    let uri = if via_proxy && !target.tls {
        target.absolute()
    } else {
        target.request_target.clone()
    };

    let mut headers = build_header_map(&request.headers)?;
    if !headers.contains_key(HOST) {
        let host = HeaderValue::from_str(&target.authority)
            .map_err(|_| ClientError::InvalidHeader { name: "host".into() })?;
        headers.insert(HOST, host);
    }

    let body = if plan.send_body {
        request.body_bytes()
    } else {
        Bytes::new()
    };

    let mut http_request = hyper::Request::builder()
        .method(plan.method.clone())
        .uri(uri)
        .body(Full::new(body))
        .map_err(|e| ClientError::InvalidUri {
            uri: request.uri.clone(),
            reason: e.to_string(),
        })?;
    *http_request.headers_mut() = headers;
    Ok(http_request)
}
