use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::AppState;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check OK")
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let registry_loaded = state.board.registry().await.is_loaded();
    let authenticated = state.session.operator().await.is_some();

    Json(json!({
        "status": "ok",
        "registryLoaded": registry_loaded,
        "authenticated": authenticated
    }))
}
