use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use utoipa::ToSchema;

use crate::client::ClinicApi;
use crate::error::WorkflowError;
use crate::models::{
    AssignmentId, AssignmentStatus, DoctorId, DoctorShiftAssignment, DoctorShiftRecord, Shift,
    ShiftId,
};
use crate::workflow::{bounded, classify};

/// In-memory cache of the doctor-shift assignments of the visible range plus
/// the shifts they reference. Only the workflow board mutates it, and only
/// after the upstream confirmed the change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShiftRegistry {
    shifts: BTreeMap<ShiftId, Shift>,
    assignments: Vec<DoctorShiftAssignment>,
    loaded: bool,
    reload: Option<PendingReload>,
    next_reload: u64,
}

/// Status changes confirmed while a reload snapshot is being fetched. They are
/// replayed onto the snapshot so it cannot roll them back.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingReload {
    token: u64,
    changes: Vec<StatusChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StatusChange {
    id: AssignmentId,
    status: AssignmentStatus,
    replacement_doctor_id: Option<DoctorId>,
}

/// One row of the week view: a shift and, per day, the assignments on it.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeekRow {
    pub shift: Shift,
    pub cells: Vec<Vec<DoctorShiftAssignment>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeekGrid {
    pub days: Vec<NaiveDate>,
    pub rows: Vec<WeekRow>,
}

impl ShiftRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from upstream records, splitting out the shift catalog.
    pub fn from_records(records: Vec<DoctorShiftRecord>) -> Self {
        let mut shifts = BTreeMap::new();
        let mut assignments = Vec::with_capacity(records.len());

        for record in records {
            let (assignment, shift) = record.into_parts();
            shifts.entry(shift.id).or_insert(shift);
            assignments.push(assignment);
        }

        Self {
            shifts,
            assignments,
            loaded: true,
            ..Self::default()
        }
    }

    /// Fetches a complete registry without touching any existing one. The
    /// upstream call is bounded by `limit`.
    pub async fn fetch(api: &dyn ClinicApi, limit: Duration) -> Result<Self, WorkflowError> {
        let records = bounded(limit, api.list_doctor_shifts()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to load doctor shifts");
            classify(&e, WorkflowError::Fetch)
        })?;

        let registry = Self::from_records(records);
        tracing::info!(
            assignments = registry.assignments.len(),
            shifts = registry.shifts.len(),
            "Doctor shifts loaded"
        );
        Ok(registry)
    }

    /// Replaces the whole collection with a fresh fetch. On failure the
    /// previous collection is kept and `WorkflowError::Fetch` returned.
    pub async fn load_all(
        &mut self,
        api: &dyn ClinicApi,
        limit: Duration,
    ) -> Result<&[DoctorShiftAssignment], WorkflowError> {
        let fresh = Self::fetch(api, limit).await?;
        self.install(fresh);
        Ok(&self.assignments)
    }

    /// Starts recording status changes for a reload whose snapshot is about to
    /// be fetched. A newer reload supersedes an older one.
    pub fn begin_reload(&mut self) -> u64 {
        self.next_reload += 1;
        self.reload = Some(PendingReload {
            token: self.next_reload,
            changes: Vec::new(),
        });
        self.next_reload
    }

    /// Installs the snapshot of reload `token` with every change confirmed
    /// since it began. Returns false when the reload was superseded.
    pub fn finish_reload(&mut self, token: u64, fresh: ShiftRegistry) -> bool {
        match self.reload.take() {
            Some(pending) if pending.token == token => {
                let mut fresh = fresh;
                for change in &pending.changes {
                    fresh.apply_status_change(change.id, change.status, change.replacement_doctor_id);
                }
                if !pending.changes.is_empty() {
                    tracing::debug!(replayed = pending.changes.len(), "Replayed status changes onto reloaded registry");
                }
                self.install(fresh);
                true
            }
            other => {
                self.reload = other;
                false
            }
        }
    }

    /// Stops recording for a failed reload, unless a newer one already took over.
    pub fn abort_reload(&mut self, token: u64) {
        if self.reload.as_ref().is_some_and(|pending| pending.token == token) {
            self.reload = None;
        }
    }

    fn install(&mut self, fresh: ShiftRegistry) {
        let next_reload = self.next_reload;
        *self = ShiftRegistry {
            next_reload,
            reload: None,
            ..fresh
        };
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn get(&self, id: AssignmentId) -> Option<&DoctorShiftAssignment> {
        self.assignments.iter().find(|a| a.id == id)
    }

    pub fn assignments(&self) -> &[DoctorShiftAssignment] {
        &self.assignments
    }

    /// Shift catalog ordered by start time.
    pub fn shifts(&self) -> Vec<&Shift> {
        let mut shifts: Vec<&Shift> = self.shifts.values().collect();
        shifts.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        shifts
    }

    /// Re-statuses one assignment in place. Unknown ids are ignored. A missing
    /// replacement doctor leaves the stored one untouched.
    pub fn apply_status_change(
        &mut self,
        id: AssignmentId,
        new_status: AssignmentStatus,
        replacement_doctor_id: Option<DoctorId>,
    ) -> bool {
        if let Some(pending) = self.reload.as_mut() {
            pending.changes.push(StatusChange {
                id,
                status: new_status,
                replacement_doctor_id,
            });
        }

        let Some(assignment) = self.assignments.iter_mut().find(|a| a.id == id) else {
            tracing::warn!(assignment_id = id, "Status change for unknown assignment ignored");
            return false;
        };

        tracing::debug!(
            assignment_id = id,
            from = assignment.status.as_str(),
            to = new_status.as_str(),
            "Applying status change"
        );

        assignment.status = new_status;
        if replacement_doctor_id.is_some() {
            assignment.replacement_doctor_id = replacement_doctor_id;
        }
        true
    }

    pub fn find_by_shift_and_date(&self, shift_id: ShiftId, date: NaiveDate) -> Vec<&DoctorShiftAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.shift_id == shift_id && a.work_date == date)
            .collect()
    }

    /// Monday-based week containing `day`, one row per shift. `None` when the
    /// week runs past the calendar range chrono can represent.
    pub fn week_grid(&self, day: NaiveDate, include_cancelled: bool) -> Option<WeekGrid> {
        let monday = day.checked_sub_days(Days::new(u64::from(day.weekday().num_days_from_monday())))?;
        let days = (0..7)
            .map(|offset| monday.checked_add_days(Days::new(offset)))
            .collect::<Option<Vec<NaiveDate>>>()?;

        let rows = self
            .shifts()
            .into_iter()
            .map(|shift| WeekRow {
                shift: shift.clone(),
                cells: days
                    .iter()
                    .map(|date| {
                        self.find_by_shift_and_date(shift.id, *date)
                            .into_iter()
                            .filter(|a| include_cancelled || a.status != AssignmentStatus::Cancelled)
                            .cloned()
                            .collect()
                    })
                    .collect(),
            })
            .collect();

        Some(WeekGrid { days, rows })
    }
}
