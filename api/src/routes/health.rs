use crate::response::ApiResponse;
use axum::{Json, Router, response::IntoResponse, routing::get};
use util::state::AppState;

/// Builds the `/health` route group.
///
/// Besides deployment probes, scanner devices poll this endpoint to decide
/// whether to submit check-ins live or queue them for later replay, so it
/// stays cheap and unauthenticated.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

/// GET /health
///
/// Reports that the API is reachable. The body carries nothing beyond the
/// standard envelope:
///
/// ```json
/// { "success": true, "data": "OK", "message": "Health check passed" }
/// ```
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::success("OK", "Health check passed"))
}
