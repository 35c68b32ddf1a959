//! Operator-facing messages of the shift workflows.

use crate::client::ClinicError;
use crate::models::CancellationResult;

pub const GENERIC_FAILURE: &str = "Đã xảy ra lỗi, vui lòng thử lại sau.";
pub const TIMEOUT: &str = "Máy chủ không phản hồi, vui lòng thử lại.";
pub const REASON_REQUIRED: &str = "Vui lòng nhập lý do hủy ca trực.";
pub const RESTORE_SUCCEEDED: &str = "Đã khôi phục ca trực thành công.";

/// Server message when the upstream sent one, generic fallback otherwise.
pub fn user_message(err: &ClinicError) -> String {
    match err {
        ClinicError::Timeout => TIMEOUT.to_string(),
        _ => err
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
    }
}

pub fn cancellation_summary(result: &CancellationResult) -> String {
    if result.total_appointments > 0 {
        format!(
            "Đã hủy ca trực thành công. Đã dời lịch {}/{} lịch hẹn.",
            result.rescheduled_count, result.total_appointments
        )
    } else {
        "Đã hủy ca trực thành công.".to_string()
    }
}

/// Informational note for appointments the upstream could not reschedule.
pub fn partial_failure_note(result: &CancellationResult) -> Option<String> {
    (result.failed_count > 0).then(|| {
        format!(
            "{} lịch hẹn không thể tự động dời lịch, vui lòng xử lý thủ công.",
            result.failed_count
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_mentions_ratio_when_appointments_affected() {
        let result = CancellationResult {
            total_appointments: 3,
            rescheduled_count: 3,
            failed_count: 0,
        };
        assert!(cancellation_summary(&result).contains("3/3"));
        assert_eq!(partial_failure_note(&result), None);
    }

    #[test]
    fn test_summary_without_appointments() {
        let result = CancellationResult {
            total_appointments: 0,
            rescheduled_count: 0,
            failed_count: 0,
        };
        assert_eq!(cancellation_summary(&result), "Đã hủy ca trực thành công.");
    }

    #[test]
    fn test_partial_failure_note() {
        let result = CancellationResult {
            total_appointments: 5,
            rescheduled_count: 3,
            failed_count: 2,
        };
        assert!(cancellation_summary(&result).contains("3/5"));
        assert!(partial_failure_note(&result).unwrap().starts_with("2 lịch hẹn"));
    }

    #[test]
    fn test_user_message_falls_back_to_generic() {
        let with_message = ClinicError::Status {
            status: 409,
            message: Some("Ca trực đã bị hủy".to_string()),
        };
        let without = ClinicError::Network("connection refused".to_string());

        assert_eq!(user_message(&with_message), "Ca trực đã bị hủy");
        assert_eq!(user_message(&without), GENERIC_FAILURE);
        assert_eq!(user_message(&ClinicError::Timeout), TIMEOUT);
    }
}
