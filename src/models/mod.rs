pub mod impact;
pub mod operator;
pub mod role;
pub mod shift;

pub use impact::{CancelShiftInput, CancellationResult, ImpactPreview};
pub use operator::{LoginInput, Operator, TokenPair};
pub use role::Role;
pub use shift::{
    AssignmentId, AssignmentStatus, Doctor, DoctorId, DoctorShiftAssignment, DoctorShiftRecord,
    Shift, ShiftId,
};
