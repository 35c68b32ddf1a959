use serde::Serialize;
use utoipa::ToSchema;

use super::{messages, TransitionError};
use crate::error::WorkflowError;
use crate::models::AssignmentId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum RestoreState {
    Idle,
    Confirming,
    Committing,
    Succeeded { message: String },
    Failed { error: WorkflowError },
}

/// Restore state machine for one cancelled assignment. No preview and no reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestoreWorkflow {
    assignment_id: AssignmentId,
    #[serde(flatten)]
    state: RestoreState,
}

impl RestoreWorkflow {
    pub fn new(assignment_id: AssignmentId) -> Self {
        Self {
            assignment_id,
            state: RestoreState::Idle,
        }
    }

    pub fn state(&self) -> &RestoreState {
        &self.state
    }

    pub fn is_in_flight(&self) -> bool {
        self.state == RestoreState::Committing
    }

    pub fn begin(&mut self) -> Result<(), TransitionError> {
        match self.state {
            RestoreState::Committing => Err(TransitionError::InFlight),
            _ => {
                self.state = RestoreState::Confirming;
                Ok(())
            }
        }
    }

    /// Confirms the restore; also the retry path out of `Failed`.
    pub fn confirm(&mut self) -> Result<(), TransitionError> {
        match self.state {
            RestoreState::Confirming | RestoreState::Failed { .. } => {
                self.state = RestoreState::Committing;
                Ok(())
            }
            RestoreState::Committing => Err(TransitionError::InFlight),
            RestoreState::Idle => Err(TransitionError::Invalid {
                action: "confirm the restore",
                state: "idle",
            }),
            RestoreState::Succeeded { .. } => Err(TransitionError::Invalid {
                action: "confirm the restore",
                state: "finished",
            }),
        }
    }

    pub fn succeeded(&mut self) -> Result<(), TransitionError> {
        self.expect_committing()?;
        self.state = RestoreState::Succeeded {
            message: messages::RESTORE_SUCCEEDED.to_string(),
        };
        Ok(())
    }

    pub fn failed(&mut self, error: WorkflowError) -> Result<(), TransitionError> {
        self.expect_committing()?;
        self.state = RestoreState::Failed { error };
        Ok(())
    }

    pub fn abandon(&mut self) -> Result<(), TransitionError> {
        if self.is_in_flight() {
            return Err(TransitionError::InFlight);
        }
        self.state = RestoreState::Idle;
        Ok(())
    }

    fn expect_committing(&self) -> Result<(), TransitionError> {
        if self.is_in_flight() {
            Ok(())
        } else {
            Err(TransitionError::Invalid {
                action: "complete the restore",
                state: "not committing",
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_happy_path() {
        let mut workflow = RestoreWorkflow::new(3);
        workflow.begin().unwrap();
        workflow.confirm().unwrap();
        assert!(workflow.is_in_flight());
        workflow.succeeded().unwrap();
        assert_eq!(
            workflow.state(),
            &RestoreState::Succeeded {
                message: messages::RESTORE_SUCCEEDED.to_string()
            }
        );
    }

    #[test]
    fn test_confirm_requires_confirmation_step() {
        let mut workflow = RestoreWorkflow::new(3);
        assert!(matches!(workflow.confirm(), Err(TransitionError::Invalid { .. })));
    }

    #[test]
    fn test_failure_can_be_retried() {
        let mut workflow = RestoreWorkflow::new(3);
        workflow.begin().unwrap();
        workflow.confirm().unwrap();
        workflow
            .failed(WorkflowError::Restore("Không thể khôi phục".to_string()))
            .unwrap();

        workflow.confirm().unwrap();
        assert_eq!(workflow.state(), &RestoreState::Committing);
    }

    #[test]
    fn test_in_flight_restore_blocks_everything() {
        let mut workflow = RestoreWorkflow::new(3);
        workflow.begin().unwrap();
        workflow.confirm().unwrap();

        assert_eq!(workflow.begin(), Err(TransitionError::InFlight));
        assert_eq!(workflow.confirm(), Err(TransitionError::InFlight));
        assert_eq!(workflow.abandon(), Err(TransitionError::InFlight));
    }

    #[test]
    fn test_abandon_returns_to_idle() {
        let mut workflow = RestoreWorkflow::new(3);
        workflow.begin().unwrap();
        workflow.abandon().unwrap();
        assert_eq!(workflow.state(), &RestoreState::Idle);
    }
}
