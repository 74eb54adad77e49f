//! Metrics collection and exposition.
//!
//! # Metrics
//! - `db_connect_attempts_total` (counter): attempts by outcome and category
//! - `db_connect_duration_seconds` (histogram): attempt latency
//! - `db_probe_total` (counter): liveness probes by outcome
//! - `db_connection_state` (gauge): ready-state code of the coordinator
//! - `http_requests_total` (counter): gated requests by status
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Prometheus exposition is opt-in via `observability.metrics_enabled`

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::database::error::ErrorCategory;
use crate::database::state::ConnectionState;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connect_attempt(outcome: Result<(), ErrorCategory>, start: Instant) {
    let (outcome, category) = match outcome {
        Ok(()) => ("success", "none"),
        Err(category) => ("failure", category.code()),
    };
    counter!("db_connect_attempts_total", "outcome" => outcome, "category" => category)
        .increment(1);
    histogram!("db_connect_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_probe(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("db_probe_total", "outcome" => outcome).increment(1);
}

pub fn record_connection_state(state: ConnectionState) {
    gauge!("db_connection_state").set(f64::from(state as u8));
}

pub fn record_gated_request(status: u16) {
    counter!("http_requests_total", "status" => status.to_string()).increment(1);
}
