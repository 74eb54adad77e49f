//! Built-in routes that do not belong to the application's API.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::http::response::UnavailableBody;
use crate::http::server::AppState;

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "API is running", "status": "ok" }))
}

pub async fn home() -> Json<serde_json::Value> {
    Json(json!({ "message": "message success" }))
}

pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Connects if needed, then always runs a fresh liveness probe.
pub async fn database_health(State(state): State<AppState>) -> Response {
    let coordinator = &state.coordinator;
    let result = match coordinator.ensure_connection().await {
        Ok(()) => coordinator.verify().await,
        Err(e) => Err(e),
    };
    let status = coordinator.status();

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "connected",
                "message": "Database is connected and responsive",
                "database": status,
            })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "disconnected",
                "failure": UnavailableBody::from(&e),
                "database": status,
            })),
        )
            .into_response(),
    }
}
