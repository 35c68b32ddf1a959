use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::AppState;

pub const DESK_KEY_HEADER: &str = "x-desk-key";

/// Middleware that requires the desk's shared key on every `/api` request
pub async fn require_desk_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let expected_key = state.config.desk_api_key.as_bytes();

    let provided_key = request
        .headers()
        .get(DESK_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // Constant-time comparison
    if expected_key.ct_eq(provided_key.as_bytes()).into() {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(path = %request.uri().path(), "Rejected request with invalid desk key");
        Err(StatusCode::UNAUTHORIZED)
    }
}
