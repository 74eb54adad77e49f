//! Response helpers.
//!
//! # Responsibilities
//! - Map connection failures to 503 JSON bodies (never 500: the condition is
//!   transient and the client may retry)
//! - Uniform JSON 404 for unknown routes
//!
//! # Design Decisions
//! - Bodies carry the category code and a fixed human message; the raw driver
//!   text stays in the logs

use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::database::error::{ConnectError, ErrorCategory};

/// Body returned when the database gate rejects a request.
#[derive(Debug, Serialize)]
pub struct UnavailableBody {
    pub error: &'static str,
    pub category: ErrorCategory,
    pub message: &'static str,
}

impl From<&ConnectError> for UnavailableBody {
    fn from(err: &ConnectError) -> Self {
        Self {
            error: "Database connection failed",
            category: err.category(),
            message: err.category().message(),
        }
    }
}

impl IntoResponse for ConnectError {
    fn into_response(self) -> Response {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(UnavailableBody::from(&self)),
        )
            .into_response()
    }
}

/// Fallback for unmatched routes.
pub async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "Route not found",
            "path": uri.path(),
        })),
    )
        .into_response()
}
