//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities and timeouts > 0)
//! - Validate selectors and addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use crate::backend::Backend;
use crate::config::schema::ClientConfig;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.pools.direct_max_size == 0 {
        errors.push(ValidationError::new("pools.direct_max_size", "must be > 0"));
    }
    if config.pools.proxy_max_size == 0 {
        errors.push(ValidationError::new("pools.proxy_max_size", "must be > 0"));
    }
    if config.backend_b.connect_timeout_ms == 0 {
        errors.push(ValidationError::new("backend_b.connect_timeout_ms", "must be > 0"));
    }

    let d = &config.defaults;
    for (field, value) in [
        ("defaults.connection_timeout_ms", d.connection_timeout_ms),
        ("defaults.network_timeout_ms", d.network_timeout_ms),
        ("defaults.general_timeout_ms", d.general_timeout_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be > 0"));
        }
    }
    if d.concurrency == 0 {
        errors.push(ValidationError::new("defaults.concurrency", "must be > 0"));
    }
    if let Err(e) = Backend::parse_selector(&d.backend) {
        errors.push(ValidationError::new("defaults.backend", e.to_string()));
    }

    let o = &config.observability;
    if !matches!(o.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("expected 'pretty' or 'json', got '{}'", o.log_format),
        ));
    }
    if o.metrics_enabled && o.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", o.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
