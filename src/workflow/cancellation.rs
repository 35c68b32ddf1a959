use serde::Serialize;
use std::mem;
use utoipa::ToSchema;

use super::{messages, TransitionError};
use crate::error::WorkflowError;
use crate::models::{AssignmentId, CancellationResult, ImpactPreview};

/// States of the shift-cancellation dialog.
///
/// `Committing` is only reachable from `ReasonEntry`, and `ReasonEntry` only
/// from a resolved preview, so a commit can never precede its preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum CancellationState {
    Idle,
    PreviewLoading,
    PreviewReady {
        preview: ImpactPreview,
    },
    ReasonEntry {
        preview: ImpactPreview,
        reason: String,
    },
    Committing {
        preview: ImpactPreview,
        reason: String,
    },
    Succeeded {
        result: CancellationResult,
        message: String,
        note: Option<String>,
    },
    /// `preview` is set when the failure happened after the preview resolved,
    /// i.e. during the commit.
    Failed {
        error: WorkflowError,
        preview: Option<ImpactPreview>,
        reason: Option<String>,
    },
}

impl CancellationState {
    pub fn name(&self) -> &'static str {
        match self {
            CancellationState::Idle => "idle",
            CancellationState::PreviewLoading => "loading the preview",
            CancellationState::PreviewReady { .. } => "showing the preview",
            CancellationState::ReasonEntry { .. } => "waiting for a reason",
            CancellationState::Committing { .. } => "committing",
            CancellationState::Succeeded { .. } => "finished",
            CancellationState::Failed { .. } => "failed",
        }
    }
}

/// What a retry from `Failed` has to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// The preview never resolved; fetch it again for the given attempt.
    FetchPreview(u64),
    /// Back in `ReasonEntry` with the previous reason.
    EditReason,
}

/// Cancellation state machine for one doctor-shift assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancellationWorkflow {
    assignment_id: AssignmentId,
    attempt: u64,
    #[serde(flatten)]
    state: CancellationState,
}

impl CancellationWorkflow {
    pub fn new(assignment_id: AssignmentId) -> Self {
        Self {
            assignment_id,
            attempt: 0,
            state: CancellationState::Idle,
        }
    }

    pub fn state(&self) -> &CancellationState {
        &self.state
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self.state,
            CancellationState::PreviewLoading | CancellationState::Committing { .. }
        )
    }

    /// Opens the dialog and starts a new preview attempt. Returns the attempt
    /// number the preview result has to be reported with.
    pub fn select(&mut self) -> Result<u64, TransitionError> {
        match self.state {
            CancellationState::Idle
            | CancellationState::Failed { .. }
            | CancellationState::Succeeded { .. } => {
                self.attempt += 1;
                self.state = CancellationState::PreviewLoading;
                Ok(self.attempt)
            }
            _ => Err(self.reject("select the shift")),
        }
    }

    pub fn preview_resolved(&mut self, attempt: u64, preview: ImpactPreview) -> Result<(), TransitionError> {
        self.expect_loading(attempt)?;
        self.state = CancellationState::PreviewReady { preview };
        Ok(())
    }

    pub fn preview_failed(&mut self, attempt: u64, error: WorkflowError) -> Result<(), TransitionError> {
        self.expect_loading(attempt)?;
        self.state = CancellationState::Failed {
            error,
            preview: None,
            reason: None,
        };
        Ok(())
    }

    /// Records the operator's reason. Any text is accepted here; blank reasons
    /// are rejected at commit time.
    pub fn enter_reason(&mut self, reason: String) -> Result<(), TransitionError> {
        match mem::replace(&mut self.state, CancellationState::Idle) {
            CancellationState::PreviewReady { preview }
            | CancellationState::ReasonEntry { preview, .. }
            | CancellationState::Failed {
                preview: Some(preview),
                ..
            } => {
                self.state = CancellationState::ReasonEntry { preview, reason };
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.reject("enter a reason"))
            }
        }
    }

    /// Moves to `Committing` and returns the trimmed reason to send upstream.
    pub fn begin_commit(&mut self) -> Result<String, TransitionError> {
        match mem::replace(&mut self.state, CancellationState::Idle) {
            CancellationState::ReasonEntry { preview, reason } => {
                let trimmed = reason.trim().to_string();
                if trimmed.is_empty() {
                    self.state = CancellationState::ReasonEntry { preview, reason };
                    return Err(TransitionError::Rejected(messages::REASON_REQUIRED.to_string()));
                }
                self.state = CancellationState::Committing {
                    preview,
                    reason: trimmed.clone(),
                };
                Ok(trimmed)
            }
            other @ CancellationState::PreviewReady { .. } => {
                self.state = other;
                Err(TransitionError::Rejected(messages::REASON_REQUIRED.to_string()))
            }
            other => {
                self.state = other;
                Err(self.reject("confirm the cancellation"))
            }
        }
    }

    pub fn commit_succeeded(&mut self, result: CancellationResult) -> Result<(), TransitionError> {
        if !matches!(self.state, CancellationState::Committing { .. }) {
            return Err(self.reject("complete the commit"));
        }
        self.state = CancellationState::Succeeded {
            message: messages::cancellation_summary(&result),
            note: messages::partial_failure_note(&result),
            result,
        };
        Ok(())
    }

    pub fn commit_failed(&mut self, error: WorkflowError) -> Result<(), TransitionError> {
        match mem::replace(&mut self.state, CancellationState::Idle) {
            CancellationState::Committing { preview, reason } => {
                self.state = CancellationState::Failed {
                    error,
                    preview: Some(preview),
                    reason: Some(reason),
                };
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.reject("fail the commit"))
            }
        }
    }

    pub fn retry(&mut self) -> Result<RetryAction, TransitionError> {
        match mem::replace(&mut self.state, CancellationState::Idle) {
            CancellationState::Failed { preview: None, .. } => {
                self.attempt += 1;
                self.state = CancellationState::PreviewLoading;
                Ok(RetryAction::FetchPreview(self.attempt))
            }
            CancellationState::Failed {
                preview: Some(preview),
                reason,
                ..
            } => {
                self.state = CancellationState::ReasonEntry {
                    preview,
                    reason: reason.unwrap_or_default(),
                };
                Ok(RetryAction::EditReason)
            }
            other => {
                self.state = other;
                Err(self.reject("retry"))
            }
        }
    }

    /// Closes the dialog. Not possible while the commit is in flight; a
    /// preview still loading is dropped when it arrives.
    pub fn abandon(&mut self) -> Result<(), TransitionError> {
        if let CancellationState::Committing { .. } = self.state {
            return Err(TransitionError::InFlight);
        }
        self.state = CancellationState::Idle;
        Ok(())
    }

    fn expect_loading(&self, attempt: u64) -> Result<(), TransitionError> {
        if attempt != self.attempt || self.state != CancellationState::PreviewLoading {
            return Err(TransitionError::Stale);
        }
        Ok(())
    }

    fn reject(&self, action: &'static str) -> TransitionError {
        if self.is_in_flight() {
            TransitionError::InFlight
        } else {
            TransitionError::Invalid {
                action,
                state: self.state.name(),
            }
        }
    }
}
