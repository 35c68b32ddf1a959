use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{
    models::LoginInput, session::SessionState, workflow::messages, AppError, AppResult, AppState,
};

/// GET /api/session - Who the desk is acting as
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Unknown, Restoring, Authenticated with the operator, or Anonymous", body = SessionState)
    ),
    tag = "session"
)]
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionState> {
    Json(state.session.state().await)
}

/// POST /api/session - Log in to the clinic API, superseding any pending restore
#[utoipa::path(
    post,
    path = "/api/session",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Authenticated session", body = SessionState),
        (status = 401, description = "Clinic API rejected the credentials")
    ),
    tag = "session"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<SessionState>> {
    state
        .session
        .login(state.auth.as_ref(), &input)
        .await
        .map_err(|e| AppError::Unauthorized(messages::user_message(&e)))?;

    Ok(Json(state.session.state().await))
}

/// DELETE /api/session
#[utoipa::path(
    delete,
    path = "/api/session",
    responses(
        (status = 200, description = "Session cleared", body = SessionState)
    ),
    tag = "session"
)]
pub async fn logout(State(state): State<Arc<AppState>>) -> Json<SessionState> {
    state.session.logout().await;
    Json(state.session.state().await)
}
