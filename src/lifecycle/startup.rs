//! Startup orchestration.
//!
//! # Design Decisions
//! - Configuration errors are fatal; database errors are not
//! - Lazy by default: the first gated request connects
//! - `database.eager_connect` warms the connection through the same
//!   coordinator, so a request arriving mid-warm-up joins that attempt

use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::database::{ConnectionCoordinator, MongoDriver};

/// Build the process-wide coordinator over the MongoDB driver.
pub fn build_coordinator(config: &DatabaseConfig) -> Arc<ConnectionCoordinator> {
    if config.target().is_none() {
        tracing::warn!("MONGO_URL is not set; data routes will answer 503 until it is configured");
    }
    Arc::new(ConnectionCoordinator::new(
        Arc::new(MongoDriver::new()),
        config.clone(),
    ))
}

/// Start connecting in the background when eager start-up is configured.
pub fn warm_up(coordinator: &Arc<ConnectionCoordinator>, config: &DatabaseConfig) {
    if !config.eager_connect {
        tracing::debug!("Lazy database connection; waiting for first request");
        return;
    }

    let coordinator = Arc::clone(coordinator);
    tokio::spawn(async move {
        if let Err(e) = coordinator.ensure_connection().await {
            tracing::warn!(
                category = %e.category(),
                "Eager database connection failed; requests will retry"
            );
        }
    });
}
