//! URI resolution for outbound calls.

use url::{Host, Url};

use crate::error::{ClientError, ClientResult};

/// Where a request goes: scheme, host, port and request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub tls: bool,
    /// Host to dial and to present for TLS (no IPv6 brackets).
    pub host: String,
    pub port: u16,
    /// `Host` header value.
    pub authority: String,
    /// Path and query, origin-form.
    pub request_target: String,
}

impl Target {
    pub fn parse(uri: &str) -> ClientResult<Self> {
        let invalid = |reason: &str| ClientError::InvalidUri {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(uri).map_err(|e| invalid(&e.to_string()))?;
        let tls = match url.scheme() {
            "http" => false,
            "https" => true,
            _ => return Err(invalid("scheme must be http or https")),
        };

        let (host, bracketed) = match url.host() {
            Some(Host::Domain(d)) => (d.to_string(), d.to_string()),
            Some(Host::Ipv4(ip)) => (ip.to_string(), ip.to_string()),
            Some(Host::Ipv6(ip)) => (ip.to_string(), format!("[{}]", ip)),
            None => return Err(invalid("missing host")),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port"))?;

        let authority = match url.port() {
            Some(p) => format!("{}:{}", bracketed, p),
            None => bracketed,
        };

        let mut request_target = match url.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };
        if let Some(q) = url.query() {
            request_target.push('?');
            request_target.push_str(q);
        }

        Ok(Self {
            tls,
            host,
            port,
            authority,
            request_target,
        })
    }

    /// Absolute-form URI, as sent to a plain HTTP proxy.
    pub fn absolute(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{}://{}{}", scheme, self.authority, self.request_target)
    }
}

/// True when the URI scheme is `https`.
pub fn is_tls_uri(uri: &str) -> bool {
    Url::parse(uri).map(|u| u.scheme() == "https").unwrap_or(false)
}
