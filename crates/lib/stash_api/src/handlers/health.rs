//! Health endpoint.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::models::HealthResponse;

/// Handles `GET /health`. Liveness plus a storage reachability bit. Public.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_connected = state.store.user_count().await.is_ok();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: stash_core::version().to_string(),
        db_connected,
    })
}
