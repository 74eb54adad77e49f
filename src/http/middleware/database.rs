//! Database gate middleware.
//! Guarantees connectivity before any data-store route runs.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;
use crate::http::X_REQUEST_ID;
use crate::observability::metrics;

/// Path trees that need the data store.
const GATED_PREFIXES: &[&str] = &["/auth", "/api"];

/// True when `path` is one of the gated trees (`/api`, `/api/...`), not a
/// look-alike such as `/apidocs`.
pub fn is_gated(path: &str) -> bool {
    GATED_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

pub async fn require_database(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !is_gated(req.uri().path()) {
        return next.run(req).await;
    }

    match state.coordinator.ensure_connection().await {
        Ok(()) => next.run(req).await,
        Err(e) => {
            let request_id = req
                .headers()
                .get(X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::warn!(
                request_id = %request_id,
                path = %req.uri().path(),
                category = %e.category(),
                "Rejecting request: database unavailable"
            );
            let response = e.into_response();
            metrics::record_gated_request(response.status().as_u16());
            response
        }
    }
}
