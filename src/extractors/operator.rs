use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

use crate::{models::Operator, session::SessionState, AppState};

/// The session operator, required to hold the admin role. Shift cancellation
/// and restore are admin-only actions.
#[derive(Debug, Clone)]
pub struct AdminOperator(pub Operator);

impl FromRequestParts<Arc<AppState>> for AdminOperator {
    type Rejection = (StatusCode, axum::Json<serde_json::Value>);

    fn from_request_parts(
        _parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let session = state.session.clone();

        async move {
            match session.state().await {
                SessionState::Authenticated(operator) if operator.role.is_admin() => {
                    Ok(AdminOperator(operator))
                }
                SessionState::Authenticated(operator) => {
                    tracing::warn!(operator_id = operator.id, role = ?operator.role, "Non-admin operator attempted a shift mutation");
                    Err((
                        StatusCode::FORBIDDEN,
                        axum::Json(json!({"error": "Chỉ quản trị viên mới được thay đổi ca trực"})),
                    ))
                }
                other => {
                    tracing::warn!(session = ?other, "Shift mutation without an authenticated session");
                    Err((
                        StatusCode::UNAUTHORIZED,
                        axum::Json(json!({"error": "Chưa đăng nhập vào hệ thống phòng khám"})),
                    ))
                }
            }
        }
    }
}
