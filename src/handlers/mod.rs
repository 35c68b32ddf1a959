pub mod cancellation_handler;
pub mod doctor_shifts_handler;
pub mod health;
pub mod metrics;
pub mod restore_handler;
pub mod session_handler;

pub use health::health_check;
