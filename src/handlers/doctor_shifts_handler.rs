use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::{
    models::{DoctorShiftAssignment, Shift},
    registry::WeekGrid,
    AppError, AppResult, AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListDoctorShiftsQuery {
    #[serde(rename = "shiftId")]
    pub shift_id: Option<i32>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct WeekQuery {
    /// Any day of the wanted week, YYYY-MM-DD
    pub date: String,
    #[serde(rename = "includeCancelled", default)]
    pub include_cancelled: bool,
}

/// Assignment joined with its shift for display.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorShiftView {
    #[serde(flatten)]
    pub assignment: DoctorShiftAssignment,
    pub shift: Option<Shift>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReloadResponse {
    pub success: bool,
    pub assignments: usize,
}

fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| AppError::BadRequest(format!("Invalid date format: {}", e)))
}

/// GET /api/doctor-shifts?shiftId=&date=
#[utoipa::path(
    get,
    path = "/api/doctor-shifts",
    params(ListDoctorShiftsQuery),
    responses(
        (status = 200, description = "Cached doctor-shift assignments, optionally for one shift on one date", body = Vec<DoctorShiftView>),
        (status = 400, description = "Invalid date or shiftId given without date")
    ),
    tag = "doctor-shifts"
)]
pub async fn list_doctor_shifts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListDoctorShiftsQuery>,
) -> AppResult<Json<Vec<DoctorShiftView>>> {
    let registry = state.board.registry().await;
    let catalog = registry.shifts();
    let view = |assignment: &DoctorShiftAssignment| DoctorShiftView {
        shift: catalog.iter().find(|s| s.id == assignment.shift_id).map(|s| (*s).clone()),
        assignment: assignment.clone(),
    };

    let views = match (query.shift_id, query.date.as_deref()) {
        (Some(shift_id), Some(date)) => registry
            .find_by_shift_and_date(shift_id, parse_date(date)?)
            .into_iter()
            .map(view)
            .collect(),
        (None, Some(date)) => {
            let date = parse_date(date)?;
            registry
                .assignments()
                .iter()
                .filter(|a| a.work_date == date)
                .map(view)
                .collect()
        }
        (Some(_), None) => {
            return Err(AppError::BadRequest("shiftId requires date".to_string()));
        }
        (None, None) => registry.assignments().iter().map(view).collect(),
    };

    Ok(Json(views))
}

/// POST /api/doctor-shifts/reload - Replace the cache with a fresh upstream fetch
#[utoipa::path(
    post,
    path = "/api/doctor-shifts/reload",
    responses(
        (status = 200, description = "Registry reloaded", body = ReloadResponse),
        (status = 502, description = "Clinic API failed"),
        (status = 504, description = "Clinic API timed out")
    ),
    tag = "doctor-shifts"
)]
pub async fn reload_doctor_shifts(State(state): State<Arc<AppState>>) -> AppResult<Json<ReloadResponse>> {
    let assignments = state.board.reload().await?;
    Ok(Json(ReloadResponse {
        success: true,
        assignments,
    }))
}

/// GET /api/doctor-shifts/week?date=&includeCancelled=
#[utoipa::path(
    get,
    path = "/api/doctor-shifts/week",
    params(WeekQuery),
    responses(
        (status = 200, description = "Monday-based week grid, one row per shift", body = WeekGrid),
        (status = 400, description = "Invalid date format, or a week beyond the supported calendar")
    ),
    tag = "doctor-shifts"
)]
pub async fn get_week_grid(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WeekQuery>,
) -> AppResult<Json<WeekGrid>> {
    let day = parse_date(&query.date)?;
    let grid = state
        .board
        .registry()
        .await
        .week_grid(day, query.include_cancelled)
        .ok_or_else(|| AppError::BadRequest(format!("Week of {} is out of range", day)))?;
    Ok(Json(grid))
}
