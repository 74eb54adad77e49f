//! Readiness verification.
//!
//! # Responsibilities
//! - Confirm a driver that reports "connected" can actually answer a request
//!
//! # Design Decisions
//! - A single ping round trip, not a domain query
//! - Own deadline, independent from the connect timeouts
//! - A failed probe is a failed connection; callers reset state on it

use std::time::Duration;

use crate::database::driver::Driver;
use crate::database::error::ConnectError;
use crate::observability::metrics;
use crate::resilience::timeouts::bounded;

#[derive(Debug, Clone, Copy)]
pub struct ReadinessVerifier {
    timeout: Duration,
}

impl ReadinessVerifier {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Issue the liveness probe.
    pub async fn verify(&self, driver: &dyn Driver) -> Result<(), ConnectError> {
        let result = bounded("liveness probe", self.timeout, driver.ping()).await;
        metrics::record_probe(result.is_ok());

        match &result {
            Ok(()) => tracing::debug!("Liveness probe succeeded"),
            Err(e) => tracing::warn!(
                category = %e.category(),
                error = %e.detail(),
                "Liveness probe failed"
            ),
        }
        result
    }
}
