//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the built-in handlers
//! - Mount the application's data-store routes behind the database gate
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve on a listener until the shutdown signal

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::ConnectionCoordinator;
use crate::http::middleware::require_database;
use crate::http::response::not_found;
use crate::http::routes;
use crate::http::X_REQUEST_ID;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ConnectionCoordinator>,
}

/// HTTP server for the backend.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a server exposing only the built-in routes.
    pub fn new(config: AppConfig, coordinator: Arc<ConnectionCoordinator>) -> Self {
        Self::with_routes(config, coordinator, Router::new())
    }

    /// Create a server with the application's `/auth` and `/api` routes
    /// mounted. Every request under those trees first goes through
    /// `ensure_connection`.
    pub fn with_routes(
        config: AppConfig,
        coordinator: Arc<ConnectionCoordinator>,
        data_routes: Router,
    ) -> Self {
        let state = AppState { coordinator };
        let router = Self::build_router(&config, state, data_routes);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState, data_routes: Router) -> Router {
        let x_request_id = axum::http::HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/", get(routes::root))
            .route("/home", get(routes::home))
            .route("/favicon.ico", get(routes::favicon))
            .route("/health/db", get(routes::database_health))
            .with_state(state.clone())
            .merge(data_routes)
            .fallback(not_found)
            // Runs for unmatched /api paths too, so they see 503 rather than
            // 404 while the store is down.
            .layer(middleware::from_fn_with_state(state, require_database))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(x_request_id))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for serving it from another host.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
