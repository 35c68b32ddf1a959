use async_trait::async_trait;
use serde_json::json;

use super::{ClinicError, Transport};
use crate::models::{LoginInput, Operator, TokenPair};

/// Session endpoints of the clinic API. Tokens are passed explicitly so the
/// session owns them, not the transport.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &LoginInput) -> Result<TokenPair, ClinicError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClinicError>;

    async fn current_operator(&self, access_token: &str) -> Result<Operator, ClinicError>;
}

#[async_trait]
impl AuthApi for Transport {
    async fn login(&self, credentials: &LoginInput) -> Result<TokenPair, ClinicError> {
        tracing::debug!(username = %credentials.username, "Logging in to clinic API");
        let payload = json!({
            "username": credentials.username,
            "password": credentials.password,
        });
        self.post_json("/auth/login", None, &payload).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClinicError> {
        let payload = json!({ "refreshToken": refresh_token });
        self.post_json("/auth/refresh-token", None, &payload).await
    }

    async fn current_operator(&self, access_token: &str) -> Result<Operator, ClinicError> {
        self.get_json("/auth/me", Some(access_token)).await
    }
}
