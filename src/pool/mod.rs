//! Connection pool registries.
//!
//! # Data Flow
//! ```text
//! request
//!     → key.rs (DirectKey / ProxyKey from connection-relevant attributes)
//!     → registry.rs (lock-free lookup)
//!         → hit: shared handle
//!         → miss: lock, re-check, capacity check, factory, insert
//! ```
//!
//! # Design Decisions
//! - Registries are owned by the client instance, never global
//! - No eviction: entries live as long as the client
//! - Capacity exhaustion is a hard error for the caller

pub mod key;
pub mod registry;

pub use key::{DirectKey, ProxyKey};
pub use registry::{PoolRegistry, DEFAULT_MAX_SIZE};
