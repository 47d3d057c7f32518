//! Transport backends.
//!
//! # Data Flow
//! ```text
//! HttpRequest
//!     → select_backend (forced value, else pooled; proxy + https → pooled)
//!     → Backend::method_plan (per-backend method table)
//!     → per_host.rs (single-host HTTP/1.1 client from the direct registry)
//!       or pooled.rs (shared reqwest client / per-proxy client)
//!     → BackendOutcome
//! ```
//!
//! # Design Decisions
//! - Closed set of two backends; capability differences live in tables
//! - Neither backend follows redirects or retries
//! - Auto method: POST when a body is present, GET otherwise

pub mod per_host;
pub mod pooled;
pub mod target;

use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use hyper::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ClientError, ClientResult};
use crate::http::HttpRequest;

pub use per_host::{HostClient, PerHostBackend};
pub use pooled::PooledBackend;
pub use target::Target;

/// The two interchangeable transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Single-host client with its own keep-alive connections.
    PerHost,
    /// Pooled client with explicit proxy support.
    Pooled,
}

impl Backend {
    /// Parse a selector where `auto` (or empty) means no forced backend.
    pub fn parse_selector(s: &str) -> ClientResult<Option<Backend>> {
        match s.trim() {
            "" | "auto" => Ok(None),
            other => other.parse().map(Some),
        }
    }

    fn method_table(self) -> &'static [(&'static str, MethodSupport)] {
        match self {
            Backend::PerHost => PER_HOST_METHODS,
            Backend::Pooled => POOLED_METHODS,
        }
    }

    /// Resolve the method to send and whether the body goes with it.
    pub fn method_plan(self, method: Option<&str>, has_body: bool) -> ClientResult<MethodPlan> {
        let Some(token) = method else {
            return Ok(if has_body {
                MethodPlan::with_body(Method::POST)
            } else {
                MethodPlan::without_body(Method::GET)
            });
        };

        let support = self
            .method_table()
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, s)| *s);

        match support {
            Some(MethodSupport::NoBody) => Ok(MethodPlan::without_body(parse_method(self, token)?)),
            Some(MethodSupport::WithBody) => Ok(MethodPlan::with_body(parse_method(self, token)?)),
            Some(MethodSupport::Unsupported) => Err(ClientError::UnsupportedMethod {
                backend: self,
                method: token.to_string(),
            }),
            None => Err(ClientError::InvalidMethod {
                backend: self,
                method: token.to_string(),
            }),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::PerHost => write!(f, "per-host"),
            Backend::Pooled => write!(f, "pooled"),
        }
    }
}

impl FromStr for Backend {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-host" | "per_host" | "perhost" | "a" => Ok(Backend::PerHost),
            "pooled" | "b" => Ok(Backend::Pooled),
            _ => Err(ClientError::InvalidBackend(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodSupport {
    NoBody,
    WithBody,
    Unsupported,
}

const PER_HOST_METHODS: &[(&str, MethodSupport)] = &[
    ("GET", MethodSupport::NoBody),
    ("HEAD", MethodSupport::NoBody),
    ("PUT", MethodSupport::WithBody),
    ("POST", MethodSupport::WithBody),
    ("DELETE", MethodSupport::WithBody),
    ("PATCH", MethodSupport::Unsupported),
    ("OPTIONS", MethodSupport::Unsupported),
    ("TRACE", MethodSupport::Unsupported),
];

const POOLED_METHODS: &[(&str, MethodSupport)] = &[
    ("GET", MethodSupport::NoBody),
    ("HEAD", MethodSupport::NoBody),
    ("OPTIONS", MethodSupport::NoBody),
    ("TRACE", MethodSupport::NoBody),
    ("POST", MethodSupport::WithBody),
    ("PUT", MethodSupport::WithBody),
    ("PATCH", MethodSupport::WithBody),
    ("DELETE", MethodSupport::WithBody),
];

fn parse_method(backend: Backend, token: &str) -> ClientResult<Method> {
    Method::from_bytes(token.as_bytes()).map_err(|_| ClientError::InvalidMethod {
        backend,
        method: token.to_string(),
    })
}

/// Method to send plus whether the request body is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodPlan {
    pub method: Method,
    pub send_body: bool,
}

impl MethodPlan {
    fn with_body(method: Method) -> Self {
        Self {
            method,
            send_body: true,
        }
    }

    fn without_body(method: Method) -> Self {
        Self {
            method,
            send_body: false,
        }
    }
}

/// Pick the backend for a request.
///
/// A forced backend is used verbatim. Otherwise the pooled backend is the
/// default, and it is also the only choice for `https` through a proxy.
pub fn select_backend(request: &HttpRequest) -> Backend {
    if let Some(forced) = request.force_backend {
        return forced;
    }
    // Per-host cannot be chosen implicitly for https through a proxy,
    // whatever the default below is.
    if request.proxy.is_some() && target::is_tls_uri(&request.uri) {
        return Backend::Pooled;
    }
    Backend::Pooled
}

/// Build a header map from request headers, rejecting invalid names/values.
pub(crate) fn build_header_map(headers: &[(String, String)]) -> ClientResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ClientError::InvalidHeader { name: name.clone() })?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| ClientError::InvalidHeader { name: name.clone() })?;
        map.append(header_name, header_value);
    }
    Ok(map)
}
