use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::shift::DoctorId;

/// Upstream-computed impact of cancelling one doctor-shift assignment.
/// Trusted verbatim; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImpactPreview {
    pub affected_appointments: u32,
    pub has_replacement_doctor: bool,
    #[serde(default)]
    pub replacement_doctor_id: Option<DoctorId>,
    pub can_auto_reschedule: bool,
    #[serde(default)]
    pub warning: Option<String>,
}

/// Result of the cancel-and-reschedule mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancellationResult {
    pub total_appointments: u32,
    pub rescheduled_count: u32,
    pub failed_count: u32,
}

/// Body of the cancel-and-reschedule request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CancelShiftInput {
    pub reason: String,
}
