use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::AdminOperator,
    models::{AssignmentId, CancelShiftInput},
    workflow::CancellationWorkflow,
    AppResult, AppState,
};

/// GET /api/doctor-shifts/{id}/cancellation - Current cancellation workflow state
#[utoipa::path(
    get,
    path = "/api/doctor-shifts/{id}/cancellation",
    params(
        ("id" = i32, Path, description = "Doctor-shift assignment id")
    ),
    responses(
        (status = 200, description = "Workflow state, Idle when nothing is open", body = CancellationWorkflow)
    ),
    tag = "cancellation"
)]
pub async fn get_cancellation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AssignmentId>,
) -> Json<CancellationWorkflow> {
    Json(state.board.cancellation(id).await)
}

/// POST /api/doctor-shifts/{id}/cancellation - Select an assignment and load its impact preview
#[utoipa::path(
    post,
    path = "/api/doctor-shifts/{id}/cancellation",
    params(
        ("id" = i32, Path, description = "Doctor-shift assignment id")
    ),
    responses(
        (status = 200, description = "PreviewReady, or Failed with a PreviewFetchError", body = CancellationWorkflow),
        (status = 401, description = "No clinic session"),
        (status = 403, description = "Operator is not an admin"),
        (status = 404, description = "Assignment not in the registry"),
        (status = 409, description = "Assignment not ACTIVE, or a workflow is in flight")
    ),
    tag = "cancellation"
)]
pub async fn select_for_cancellation(
    State(state): State<Arc<AppState>>,
    AdminOperator(operator): AdminOperator,
    Path(id): Path<AssignmentId>,
) -> AppResult<Json<CancellationWorkflow>> {
    tracing::info!(assignment_id = id, operator_id = operator.id, "Opening cancellation");
    Ok(Json(state.board.select_for_cancellation(id).await?))
}

/// PUT /api/doctor-shifts/{id}/cancellation/reason
#[utoipa::path(
    put,
    path = "/api/doctor-shifts/{id}/cancellation/reason",
    params(
        ("id" = i32, Path, description = "Doctor-shift assignment id")
    ),
    request_body = CancelShiftInput,
    responses(
        (status = 200, description = "ReasonEntry with the stored reason", body = CancellationWorkflow),
        (status = 409, description = "No preview loaded for this assignment")
    ),
    tag = "cancellation"
)]
pub async fn enter_reason(
    State(state): State<Arc<AppState>>,
    _admin: AdminOperator,
    Path(id): Path<AssignmentId>,
    Json(input): Json<CancelShiftInput>,
) -> AppResult<Json<CancellationWorkflow>> {
    Ok(Json(state.board.enter_reason(id, input.reason).await?))
}

/// POST /api/doctor-shifts/{id}/cancellation/confirm - Cancel and reschedule
#[utoipa::path(
    post,
    path = "/api/doctor-shifts/{id}/cancellation/confirm",
    params(
        ("id" = i32, Path, description = "Doctor-shift assignment id")
    ),
    responses(
        (status = 200, description = "Succeeded with the reschedule summary, or Failed with a CommitError/TimeoutError", body = CancellationWorkflow),
        (status = 409, description = "Commit already in flight or no reason entered"),
        (status = 422, description = "Reason is empty")
    ),
    tag = "cancellation"
)]
pub async fn confirm_cancellation(
    State(state): State<Arc<AppState>>,
    AdminOperator(operator): AdminOperator,
    Path(id): Path<AssignmentId>,
) -> AppResult<Json<CancellationWorkflow>> {
    tracing::info!(assignment_id = id, operator_id = operator.id, "Confirming cancellation");
    Ok(Json(state.board.confirm_cancellation(id).await?))
}

/// POST /api/doctor-shifts/{id}/cancellation/retry
#[utoipa::path(
    post,
    path = "/api/doctor-shifts/{id}/cancellation/retry",
    params(
        ("id" = i32, Path, description = "Doctor-shift assignment id")
    ),
    responses(
        (status = 200, description = "Preview re-fetched, or ReasonEntry restored for another commit attempt", body = CancellationWorkflow),
        (status = 409, description = "Workflow is not Failed")
    ),
    tag = "cancellation"
)]
pub async fn retry_cancellation(
    State(state): State<Arc<AppState>>,
    _admin: AdminOperator,
    Path(id): Path<AssignmentId>,
) -> AppResult<Json<CancellationWorkflow>> {
    Ok(Json(state.board.retry_cancellation(id).await?))
}

/// DELETE /api/doctor-shifts/{id}/cancellation - Close the dialog without changes
#[utoipa::path(
    delete,
    path = "/api/doctor-shifts/{id}/cancellation",
    params(
        ("id" = i32, Path, description = "Doctor-shift assignment id")
    ),
    responses(
        (status = 200, description = "Workflow back to Idle", body = CancellationWorkflow),
        (status = 409, description = "Commit in flight")
    ),
    tag = "cancellation"
)]
pub async fn abandon_cancellation(
    State(state): State<Arc<AppState>>,
    _admin: AdminOperator,
    Path(id): Path<AssignmentId>,
) -> AppResult<Json<CancellationWorkflow>> {
    Ok(Json(state.board.abandon_cancellation(id).await?))
}
