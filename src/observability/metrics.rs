//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define client metrics (calls, latency, pool allocations)
//! - Expose Prometheus-compatible metrics endpoint (binary only)
//!
//! # Metrics
//! - `http_client_requests_total` (counter): calls by backend, outcome
//! - `http_client_request_duration_seconds` (histogram): latency by backend
//! - `http_client_pool_allocations_total` (counter): new pool entries by registry
//! - `http_client_pool_size` (gauge): entries per registry
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one finished call.
pub fn record_request(backend: &str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(
        "http_client_requests_total",
        "backend" => backend.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(
        "http_client_request_duration_seconds",
        "backend" => backend.to_string()
    )
    .record(elapsed.as_secs_f64());
}

/// Record a new pool entry and the registry size after insertion.
pub fn record_pool_allocation(registry: &'static str, size: usize) {
    metrics::counter!("http_client_pool_allocations_total", "registry" => registry).increment(1);
    metrics::gauge!("http_client_pool_size", "registry" => registry).set(size as f64);
}
