//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, pool size > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - A missing database URL is NOT a validation error; it surfaces per request
//!   as a configuration failure so the process still serves its other routes

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single failed check.
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

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let db = &config.database;
    let positive = [
        ("database.server_selection_timeout_ms", db.server_selection_timeout_ms),
        ("database.socket_timeout_ms", db.socket_timeout_ms),
        ("database.connect_timeout_ms", db.connect_timeout_ms),
        ("database.probe_timeout_ms", db.probe_timeout_ms),
        ("database.close_timeout_ms", db.close_timeout_ms),
        ("database.poll_interval_ms", db.poll_interval_ms),
        ("database.connecting_wait_ms", db.connecting_wait_ms),
        ("database.disconnecting_wait_ms", db.disconnecting_wait_ms),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if db.max_pool_size == 0 {
        errors.push(ValidationError::new(
            "database.max_pool_size",
            "must be greater than zero",
        ));
    }

    if db.poll_interval_ms >= db.connecting_wait_ms.min(db.disconnecting_wait_ms) {
        errors.push(ValidationError::new(
            "database.poll_interval_ms",
            "must be shorter than the transition waits",
        ));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format '{}'", config.observability.log_format),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
