use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Upstream(#[from] WorkflowError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Upstream(WorkflowError::Timeout(msg)) => (StatusCode::GATEWAY_TIMEOUT, msg),
            AppError::Upstream(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Failures of the shift workflows, each carrying the message shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, ToSchema)]
#[serde(tag = "kind", content = "message")]
pub enum WorkflowError {
    /// Bulk load of doctor shifts failed; blocks the whole page.
    #[error("{0}")]
    #[serde(rename = "FetchError")]
    Fetch(String),

    /// Impact preview failed; retryable inside the dialog.
    #[error("{0}")]
    #[serde(rename = "PreviewFetchError")]
    PreviewFetch(String),

    #[error("{0}")]
    #[serde(rename = "CommitError")]
    Commit(String),

    #[error("{0}")]
    #[serde(rename = "RestoreError")]
    Restore(String),

    #[error("{0}")]
    #[serde(rename = "TimeoutError")]
    Timeout(String),
}
