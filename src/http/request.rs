//! Request description handed to the client.
//!
//! # Responsibilities
//! - Carry the target, method, body and headers of one call
//! - Carry connection-relevant knobs (timeouts, concurrency, TLS, IPv6, proxy)
//! - Optional forced backend
//!
//! # Design Decisions
//! - The client never mutates a request; the response keeps its own copy
//! - An absent method means auto-detection from the body

use bytes::Bytes;
use std::fmt;
use std::time::Duration;

use crate::backend::Backend;
use crate::config::RequestDefaults;
use crate::error::ClientResult;

pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_GENERAL_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CONCURRENCY: usize = 8192;

/// Host and port of an HTTP proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
}

impl ProxyEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// URL the pooled backend uses to reach the proxy.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl std::str::FromStr for ProxyEndpoint {
    type Err = String;

    /// Parse `host:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected host:port, got '{}'", s))?;
        if host.is_empty() {
            return Err(format!("empty proxy host in '{}'", s));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| format!("invalid proxy port in '{}': {}", s, e))?;
        Ok(Self::new(host, port))
    }
}

/// One HTTP call to execute.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Target URI.
    pub uri: String,
    /// HTTP method token. `None` picks POST when a body is present, else GET.
    pub method: Option<String>,
    /// Request body.
    pub body: Option<Bytes>,
    /// Request headers, in insertion order.
    pub headers: Vec<(String, String)>,
    /// TCP connect timeout.
    pub connection_timeout: Duration,
    /// Send/read timeout once connected.
    pub network_timeout: Duration,
    /// Overall deadline for the whole call.
    pub general_timeout: Duration,
    /// Connection bound for a per-host client.
    pub concurrency: usize,
    /// Skip TLS certificate and hostname verification.
    pub https_insecure: bool,
    /// Only dial IPv4 addresses.
    pub disable_ipv6: bool,
    /// Route the call through this HTTP proxy.
    pub proxy: Option<ProxyEndpoint>,
    /// Backend to use; `None` lets the client decide.
    pub force_backend: Option<Backend>,
}

impl HttpRequest {
    /// Create a GET-or-POST request with default timeouts.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            method: None,
            body: None,
            headers: Vec::new(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
            general_timeout: DEFAULT_GENERAL_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            https_insecure: false,
            disable_ipv6: false,
            proxy: None,
            force_backend: None,
        }
    }

    /// Create a request using configured defaults.
    ///
    /// Fails with [`InvalidBackend`](crate::error::ClientError::InvalidBackend)
    /// when the configured backend selector is unknown.
    pub fn with_defaults(uri: impl Into<String>, defaults: &RequestDefaults) -> ClientResult<Self> {
        let force_backend = Backend::parse_selector(&defaults.backend)?;
        Ok(Self {
            connection_timeout: Duration::from_millis(defaults.connection_timeout_ms),
            network_timeout: Duration::from_millis(defaults.network_timeout_ms),
            general_timeout: Duration::from_millis(defaults.general_timeout_ms),
            concurrency: defaults.concurrency,
            https_insecure: defaults.https_insecure,
            disable_ipv6: defaults.disable_ipv6,
            force_backend,
            ..Self::new(uri)
        })
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn general_timeout(mut self, timeout: Duration) -> Self {
        self.general_timeout = timeout;
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn insecure(mut self, insecure: bool) -> Self {
        self.https_insecure = insecure;
        self
    }

    pub fn disable_ipv6(mut self, disable: bool) -> Self {
        self.disable_ipv6 = disable;
        self
    }

    pub fn proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy = Some(ProxyEndpoint::new(host, port));
        self
    }

    pub fn force_backend(mut self, backend: Backend) -> Self {
        self.force_backend = Some(backend);
        self
    }

    /// True when a non-empty body is attached.
    pub fn has_body(&self) -> bool {
        self.body.as_ref().is_some_and(|b| !b.is_empty())
    }

    /// Body bytes, empty when absent.
    pub fn body_bytes(&self) -> Bytes {
        self.body.clone().unwrap_or_default()
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.method.as_deref().unwrap_or("AUTO"),
            self.uri
        )?;
        if let Some(proxy) = &self.proxy {
            write!(f, " via {}", proxy)?;
        }
        Ok(())
    }
}
