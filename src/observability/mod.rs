//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! pool registries, backends, dispatcher produce:
//!     → tracing events (structured fields: backend, status, key, elapsed)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers (binary only):
//!     → logging.rs subscriber (pretty or JSON to stdout)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing subscribers/recorders is the binary's job
//! - Call IDs flow through the dispatcher span

pub mod logging;
pub mod metrics;
