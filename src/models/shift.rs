use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type AssignmentId = i32;
pub type ShiftId = i32;
pub type DoctorId = i32;

/// Named time-of-day template. Times are local wall-clock strings (HH:MM[:SS]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: ShiftId,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: DoctorId,
    pub full_name: String,
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Active,
    Cancelled,
    Replaced,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Active => "ACTIVE",
            AssignmentStatus::Cancelled => "CANCELLED",
            AssignmentStatus::Replaced => "REPLACED",
        }
    }
}

/// Doctor-shift assignment as the upstream returns it, with the doctor and shift embedded.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorShiftRecord {
    pub id: AssignmentId,
    pub doctor: Doctor,
    pub shift: Shift,
    pub work_date: NaiveDate,
    pub status: AssignmentStatus,
    #[serde(default)]
    pub replacement_doctor_id: Option<DoctorId>,
    #[serde(default, alias = "cancelReason")]
    pub cancellation_reason: Option<String>,
}

/// Binds one doctor to one shift on one date. The shift itself lives in the
/// registry's catalog and is referenced by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorShiftAssignment {
    pub id: AssignmentId,
    pub doctor: Doctor,
    pub shift_id: ShiftId,
    pub work_date: NaiveDate,
    pub status: AssignmentStatus,
    pub replacement_doctor_id: Option<DoctorId>,
    pub cancellation_reason: Option<String>,
}

impl DoctorShiftRecord {
    /// Splits the record into the assignment and the shift it references.
    pub fn into_parts(self) -> (DoctorShiftAssignment, Shift) {
        let assignment = DoctorShiftAssignment {
            id: self.id,
            doctor: self.doctor,
            shift_id: self.shift.id,
            work_date: self.work_date,
            status: self.status,
            replacement_doctor_id: self.replacement_doctor_id,
            cancellation_reason: self.cancellation_reason,
        };
        (assignment, self.shift)
    }
}
