//! Social backend API server.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 API SERVER                    │
//!    Client Request      │  ┌─────────┐    ┌──────────┐   ┌──────────┐   │
//!    ────────────────────┼─▶│  http   │───▶│ database │──▶│  /auth   │   │
//!                        │  │ server  │    │   gate   │   │  /api    │   │
//!                        │  └─────────┘    └────┬─────┘   └──────────┘   │
//!                        │                      │                        │
//!                        │                      ▼                        │
//!                        │              ┌───────────────┐                │
//!                        │              │  connection   │   connect /    │
//!                        │              │  coordinator  │───ping/close──▶┼── MongoDB
//!                        │              └───────────────┘                │
//!                        │  ┌─────────┐ ┌──────────┐ ┌────────────────┐  │
//!                        │  │ config  │ │ observa- │ │   lifecycle    │  │
//!                        │  │         │ │ bility   │ │ signals/drain  │  │
//!                        │  └─────────┘ └──────────┘ └────────────────┘  │
//!                        └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use social_backend::config::load_config;
use social_backend::http::HttpServer;
use social_backend::lifecycle::{signals, startup, Shutdown};
use social_backend::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "social-backend")]
#[command(about = "Social media API server", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; environment variables override it.
    #[arg(short, long, env = "SOCIAL_BACKEND_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!("social-backend v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        target_configured = config.database.target().is_some(),
        connect_timeout_ms = config.database.connect_timeout_ms,
        max_pool_size = config.database.max_pool_size,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation guarantees the address parses.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let shutdown = Shutdown::new();
    let coordinator = startup::build_coordinator(&config.database);
    let watcher = coordinator.watch_driver_events(shutdown.subscribe());
    startup::warm_up(&coordinator, &config.database);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, coordinator.clone());
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::wait_for_shutdown_signal().await;
    shutdown.trigger();

    server_task.await??;
    coordinator.shutdown().await;
    let _ = watcher.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
