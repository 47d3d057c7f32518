//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::pool::DEFAULT_MAX_SIZE;

/// Root configuration for the HTTP client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Pool registry capacities.
    pub pools: PoolConfig,

    /// Pooled backend (reqwest) settings.
    pub backend_b: PooledBackendConfig,

    /// Defaults applied by `HttpClient::request`.
    pub defaults: RequestDefaults,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Pool registry capacities.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum per-host clients in the direct registry.
    pub direct_max_size: usize,

    /// Maximum proxy clients in the proxy registry.
    pub proxy_max_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            direct_max_size: DEFAULT_MAX_SIZE,
            proxy_max_size: DEFAULT_MAX_SIZE,
        }
    }
}

/// Settings shared by every client of the pooled backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PooledBackendConfig {
    /// Idle connections kept per host.
    pub pool_max_idle_per_host: usize,

    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
}

impl Default for PooledBackendConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 1024,
            connect_timeout_ms: 10_000,
            accept_invalid_certs: false,
        }
    }
}

/// Defaults for requests created through the client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestDefaults {
    pub connection_timeout_ms: u64,
    pub network_timeout_ms: u64,
    pub general_timeout_ms: u64,
    pub concurrency: usize,
    pub https_insecure: bool,
    pub disable_ipv6: bool,

    /// "auto", "per-host" or "pooled".
    pub backend: String,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            connection_timeout_ms: 10_000,
            network_timeout_ms: 60_000,
            general_timeout_ms: 60_000,
            concurrency: 8192,
            https_insecure: false,
            disable_ipv6: false,
            backend: "auto".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
