pub mod board;
pub mod cancellation;
pub mod messages;
pub mod restore;

use std::future::Future;
use std::time::Duration;

pub use board::WorkflowBoard;
pub use cancellation::{CancellationState, CancellationWorkflow, RetryAction};
pub use restore::{RestoreState, RestoreWorkflow};

use crate::client::ClinicError;
use crate::error::{AppError, WorkflowError};

/// Rejected workflow transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Cannot {action} while the workflow is {state}")]
    Invalid {
        action: &'static str,
        state: &'static str,
    },

    #[error("A request for this shift is already in progress")]
    InFlight,

    #[error("Result belongs to a superseded attempt")]
    Stale,

    #[error("{0}")]
    Rejected(String),
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::Rejected(msg) => AppError::Validation(msg),
            other => AppError::Conflict(other.to_string()),
        }
    }
}

/// Maps an upstream failure to the workflow taxonomy. Timeouts always become
/// `WorkflowError::Timeout`; everything else keeps the server message.
pub fn classify(err: &ClinicError, wrap: fn(String) -> WorkflowError) -> WorkflowError {
    if err.is_timeout() {
        WorkflowError::Timeout(messages::TIMEOUT.to_string())
    } else {
        wrap(messages::user_message(err))
    }
}

/// Runs an upstream call under `limit`; expiry is reported as `ClinicError::Timeout`.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, ClinicError>
where
    F: Future<Output = Result<T, ClinicError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = limit.as_millis() as u64, "Clinic API call timed out");
            Err(ClinicError::Timeout)
        }
    }
}
