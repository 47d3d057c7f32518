//! Pool keys.
//!
//! A key captures every request attribute that changes which connection
//! handle is valid to reuse. Two requests with equal keys share a handle.

use std::fmt;

use crate::backend::target::Target;
use crate::http::{HttpRequest, ProxyEndpoint};

/// Key of the direct registry (per-host clients).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectKey {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub insecure: bool,
    pub disable_ipv6: bool,
    pub connect_timeout_ms: u128,
    pub network_timeout_ms: u128,
    pub concurrency: usize,
    pub proxy: Option<ProxyEndpoint>,
}

impl DirectKey {
    pub fn new(target: &Target, request: &HttpRequest) -> Self {
        Self {
            host: target.host.clone(),
            port: target.port,
            tls: target.tls,
            insecure: request.https_insecure,
            disable_ipv6: request.disable_ipv6,
            connect_timeout_ms: request.connection_timeout.as_millis(),
            network_timeout_ms: request.network_timeout.as_millis(),
            concurrency: request.concurrency,
            proxy: request.proxy.clone(),
        }
    }
}

impl fmt::Display for DirectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}#{}#{}#{}#{}#{}#{}#",
            self.host,
            self.port,
            self.tls,
            self.insecure,
            self.disable_ipv6,
            self.connect_timeout_ms,
            self.network_timeout_ms,
            self.concurrency,
        )?;
        match &self.proxy {
            Some(p) => write!(f, "{}#{}#", p.host, p.port),
            None => write!(f, "None#None#"),
        }
    }
}

/// Key of the proxy registry (pooled proxy clients).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyKey {
    pub host: String,
    pub port: u16,
}

impl From<&ProxyEndpoint> for ProxyKey {
    fn from(p: &ProxyEndpoint) -> Self {
        Self {
            host: p.host.clone(),
            port: p.port,
        }
    }
}

impl fmt::Display for ProxyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}#", self.host, self.port)
    }
}
