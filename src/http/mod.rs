//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → routes.rs (/, /home, /health/db)
//!     → middleware/database.rs (gate in front of /auth and /api)
//!     → application routes
//!     → response.rs (503 / 404 JSON bodies)
//! ```

pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;

pub use server::{AppState, HttpServer};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";
