use std::sync::Arc;
use std::time::Duration;

use crate::client::ClinicApi;
use crate::error::WorkflowError;
use crate::models::{AssignmentId, ImpactPreview};
use crate::workflow::{bounded, classify};

/// Fetches the impact of cancelling an assignment. Every call goes upstream:
/// appointment counts change between attempts, so nothing is cached.
#[derive(Clone)]
pub struct ImpactPreviewService {
    api: Arc<dyn ClinicApi>,
    timeout: Duration,
}

impl ImpactPreviewService {
    pub fn new(api: Arc<dyn ClinicApi>, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    pub async fn fetch_preview(&self, assignment_id: AssignmentId) -> Result<ImpactPreview, WorkflowError> {
        match bounded(self.timeout, self.api.preview_cancellation(assignment_id)).await {
            Ok(preview) => {
                tracing::debug!(
                    assignment_id,
                    affected = preview.affected_appointments,
                    replacement = ?preview.replacement_doctor_id,
                    "Impact preview received"
                );
                Ok(preview)
            }
            Err(e) => {
                tracing::error!(error = %e, assignment_id, "Impact preview failed");
                Err(classify(&e, WorkflowError::PreviewFetch))
            }
        }
    }
}
