//! Social backend: serverless-safe lazy database connectivity.

pub mod config;
pub mod database;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::AppConfig;
pub use database::{ConnectError, ConnectionCoordinator, ErrorCategory};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
