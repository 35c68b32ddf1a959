use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::AdminOperator, models::AssignmentId, workflow::RestoreWorkflow, AppResult,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/doctor-shifts/{id}/restore",
    params(
        ("id" = i32, Path, description = "Doctor-shift assignment id")
    ),
    responses(
        (status = 200, description = "Restore workflow state", body = RestoreWorkflow)
    ),
    tag = "restore"
)]
pub async fn get_restore(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AssignmentId>,
) -> Json<RestoreWorkflow> {
    Json(state.board.restore(id).await)
}

/// POST /api/doctor-shifts/{id}/restore - Open the restore confirmation
#[utoipa::path(
    post,
    path = "/api/doctor-shifts/{id}/restore",
    params(
        ("id" = i32, Path, description = "Doctor-shift assignment id")
    ),
    responses(
        (status = 200, description = "Confirming", body = RestoreWorkflow),
        (status = 404, description = "Assignment not in the registry"),
        (status = 409, description = "Assignment not CANCELLED, or a workflow is open")
    ),
    tag = "restore"
)]
pub async fn begin_restore(
    State(state): State<Arc<AppState>>,
    _admin: AdminOperator,
    Path(id): Path<AssignmentId>,
) -> AppResult<Json<RestoreWorkflow>> {
    Ok(Json(state.board.begin_restore(id).await?))
}

/// POST /api/doctor-shifts/{id}/restore/confirm - Also retries a failed restore
#[utoipa::path(
    post,
    path = "/api/doctor-shifts/{id}/restore/confirm",
    params(
        ("id" = i32, Path, description = "Doctor-shift assignment id")
    ),
    responses(
        (status = 200, description = "Succeeded, or Failed with a RestoreError/TimeoutError", body = RestoreWorkflow),
        (status = 409, description = "Nothing to confirm or already in flight")
    ),
    tag = "restore"
)]
pub async fn confirm_restore(
    State(state): State<Arc<AppState>>,
    AdminOperator(operator): AdminOperator,
    Path(id): Path<AssignmentId>,
) -> AppResult<Json<RestoreWorkflow>> {
    tracing::info!(assignment_id = id, operator_id = operator.id, "Confirming restore");
    Ok(Json(state.board.confirm_restore(id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/doctor-shifts/{id}/restore",
    params(
        ("id" = i32, Path, description = "Doctor-shift assignment id")
    ),
    responses(
        (status = 200, description = "Workflow back to Idle", body = RestoreWorkflow),
        (status = 409, description = "Restore in flight")
    ),
    tag = "restore"
)]
pub async fn abandon_restore(
    State(state): State<Arc<AppState>>,
    _admin: AdminOperator,
    Path(id): Path<AssignmentId>,
) -> AppResult<Json<RestoreWorkflow>> {
    Ok(Json(state.board.abandon_restore(id).await?))
}
