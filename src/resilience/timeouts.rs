//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap every network-facing driver call with its own deadline
//! - Turn an elapsed deadline into a `Timeout` category error
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from driver errors and name the step that expired

use std::future::Future;
use std::time::Duration;
use tokio::time;

use crate::database::error::ConnectError;

/// Run `fut` with a deadline. Errors from `fut` are converted (and classified)
/// into [`ConnectError`]; an elapsed deadline becomes a timeout naming `step`.
pub async fn bounded<T, E, F>(step: &str, limit: Duration, fut: F) -> Result<T, ConnectError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ConnectError>,
{
    match time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(ConnectError::timeout(step, limit)),
    }
}
