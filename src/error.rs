//! Error taxonomy for request execution.
//!
//! Every variant except [`ClientError::CapacityExceeded`] is absorbed by
//! [`HttpClient::execute`](crate::client::HttpClient::execute) and surfaced
//! through [`HttpResponse::error`](crate::http::HttpResponse::error).

use std::time::Duration;
use thiserror::Error;

use crate::backend::Backend;

/// Result alias used across the crate.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while executing a request.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A pool registry is full and the key is new.
    #[error("{registry} pool maxed, cur={current}, max={max}")]
    CapacityExceeded {
        registry: &'static str,
        current: usize,
        max: usize,
    },

    /// The method exists but the resolved backend cannot issue it.
    #[error("Unsupported {backend} method={method}")]
    UnsupportedMethod { backend: Backend, method: String },

    /// The method token is unknown to the resolved backend.
    #[error("Invalid {backend} method={method}")]
    InvalidMethod { backend: Backend, method: String },

    /// The transport gave back no response at all.
    #[error("No response from http")]
    NoResponse,

    /// The general deadline elapsed before the call completed.
    #[error("Timeout while processing, general_timeout_sec={:.3}", .general_timeout.as_secs_f64())]
    Timeout { general_timeout: Duration },

    /// The client configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A backend selector did not name a known backend.
    #[error("Invalid backend selector: {0}")]
    InvalidBackend(String),

    /// The request URI could not be used.
    #[error("Invalid uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// A request header name or value is not valid HTTP.
    #[error("Invalid header '{name}'")]
    InvalidHeader { name: String },

    /// Establishing a TCP connection took longer than the connection timeout.
    #[error("Connect timeout after {0:?}")]
    ConnectTimeout(Duration),

    /// Sending or reading took longer than the network timeout.
    #[error("Network timeout after {0:?}")]
    NetworkTimeout(Duration),

    /// Name resolution produced no usable address.
    #[error("DNS resolution failed for {host}: {reason}")]
    Dns { host: String, reason: String },

    /// TCP connection failure.
    #[error("Connect error: {0}")]
    Connect(#[source] std::io::Error),

    /// The proxy refused or broke a CONNECT tunnel.
    #[error("Proxy tunnel error: {0}")]
    ProxyTunnel(String),

    /// TLS setup or handshake failure.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// HTTP/1 protocol failure on a per-host connection.
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// Failure reported by the pooled backend.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

impl ClientError {
    /// True for the only error allowed to escape `execute`.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, ClientError::CapacityExceeded { .. })
    }

    /// True when the general deadline fired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::CapacityExceeded { .. } => "capacity_exceeded",
            ClientError::UnsupportedMethod { .. } => "unsupported_method",
            ClientError::InvalidMethod { .. } => "invalid_method",
            ClientError::NoResponse => "no_response",
            ClientError::Timeout { .. } => "timeout",
            ClientError::InvalidConfig(_) => "invalid_config",
            ClientError::InvalidBackend(_) => "invalid_backend",
            ClientError::InvalidUri { .. } => "invalid_uri",
            ClientError::InvalidHeader { .. } => "invalid_header",
            ClientError::ConnectTimeout(_) => "connect_timeout",
            ClientError::NetworkTimeout(_) => "network_timeout",
            ClientError::Dns { .. } => "dns",
            ClientError::Connect(_) => "connect",
            ClientError::ProxyTunnel(_) => "proxy_tunnel",
            ClientError::Tls(_) => "tls",
            ClientError::Http(_) => "http",
            ClientError::Request(_) => "request",
        }
    }
}
