pub mod auth;
pub mod error;
pub mod transport;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;

pub use auth::AuthApi;
pub use error::ClinicError;
pub use transport::Transport;

use crate::models::{AssignmentId, CancellationResult, DoctorShiftRecord, ImpactPreview};
use crate::session::Session;

/// Remote operations the shift workflows consume.
#[async_trait]
pub trait ClinicApi: Send + Sync {
    async fn list_doctor_shifts(&self) -> Result<Vec<DoctorShiftRecord>, ClinicError>;

    async fn preview_cancellation(&self, id: AssignmentId) -> Result<ImpactPreview, ClinicError>;

    async fn cancel_and_reschedule(
        &self,
        id: AssignmentId,
        reason: &str,
    ) -> Result<CancellationResult, ClinicError>;

    async fn restore_shift(&self, id: AssignmentId) -> Result<(), ClinicError>;
}

/// `ClinicApi` over HTTP, authorized with the shared session.
pub struct HttpClinicApi {
    transport: Transport,
    session: Arc<Session>,
}

impl HttpClinicApi {
    pub fn new(transport: Transport, session: Arc<Session>) -> Self {
        Self { transport, session }
    }

    /// Sends an authorized request; on a 401 the session is refreshed once and
    /// the request retried once.
    async fn authorized(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<String, ClinicError> {
        let token = self.session.usable_access_token(&self.transport).await;

        match self
            .transport
            .send(method.clone(), path, token.as_deref(), body)
            .await
        {
            Err(ClinicError::Unauthorized) => {
                tracing::info!(path, "Access token rejected, refreshing session");
                let token = self.session.refresh(&self.transport).await?;
                self.transport.send(method, path, Some(&token), body).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl ClinicApi for HttpClinicApi {
    async fn list_doctor_shifts(&self) -> Result<Vec<DoctorShiftRecord>, ClinicError> {
        let body = self.authorized(Method::GET, "/doctor-shifts", None).await?;
        transport::decode(&body)
    }

    async fn preview_cancellation(&self, id: AssignmentId) -> Result<ImpactPreview, ClinicError> {
        let path = format!("/doctor-shifts/{}/cancel-preview", id);
        let body = self.authorized(Method::GET, &path, None).await?;
        transport::decode(&body)
    }

    async fn cancel_and_reschedule(
        &self,
        id: AssignmentId,
        reason: &str,
    ) -> Result<CancellationResult, ClinicError> {
        let path = format!("/doctor-shifts/{}/cancel-and-reschedule", id);
        let payload = json!({ "reason": reason });
        let body = self.authorized(Method::POST, &path, Some(&payload)).await?;
        transport::decode(&body)
    }

    async fn restore_shift(&self, id: AssignmentId) -> Result<(), ClinicError> {
        let path = format!("/doctor-shifts/{}/restore", id);
        self.authorized(Method::PUT, &path, None).await?;
        Ok(())
    }
}
