use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::client::{AuthApi, ClinicError};
use crate::models::{LoginInput, Operator, TokenPair};

/// Seconds before `exp` at which an access token is already treated as expired.
const EXPIRY_SKEW_SECS: i64 = 30;

/// Lifecycle of the desk's upstream session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "state", content = "operator", rename_all = "camelCase")]
pub enum SessionState {
    Unknown,
    Restoring,
    Authenticated(Operator),
    Anonymous,
}

struct SessionInner {
    state: SessionState,
    tokens: Option<TokenPair>,
    /// Bumped by every restore, login and logout. A pending operation whose
    /// generation is no longer current must not touch the session.
    generation: u64,
}

/// Explicit session object shared by the HTTP client and the request handlers.
pub struct Session {
    inner: RwLock<SessionInner>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SessionInner {
                state: SessionState::Unknown,
                tokens: None,
                generation: 0,
            }),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.inner.read().await.state.clone()
    }

    pub async fn operator(&self) -> Option<Operator> {
        match &self.inner.read().await.state {
            SessionState::Authenticated(operator) => Some(operator.clone()),
            _ => None,
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .tokens
            .as_ref()
            .map(|t| t.access_token.clone())
    }

    /// Restores a session from a stored refresh token:
    /// `Unknown → Restoring → Authenticated | Anonymous`.
    pub async fn restore(&self, auth: &dyn AuthApi, refresh_token: Option<String>) -> SessionState {
        let generation = {
            let mut inner = self.inner.write().await;
            if let SessionState::Authenticated(_) = inner.state {
                return inner.state.clone();
            }
            inner.generation += 1;
            inner.state = SessionState::Restoring;
            inner.generation
        };

        let Some(refresh_token) = refresh_token else {
            tracing::info!("No stored refresh token, session is anonymous");
            return self.settle(generation, None).await;
        };

        tracing::debug!("Restoring clinic API session");

        let outcome = match auth.refresh(&refresh_token).await {
            Ok(tokens) => {
                let tokens = TokenPair {
                    refresh_token: tokens.refresh_token.or(Some(refresh_token)),
                    access_token: tokens.access_token,
                };
                match auth.current_operator(&tokens.access_token).await {
                    Ok(operator) => Some((tokens, operator)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to load operator during session restore");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored refresh token rejected");
                None
            }
        };

        self.settle(generation, outcome).await
    }

    /// Logs in with credentials. Supersedes any restore still in flight.
    pub async fn login(
        &self,
        auth: &dyn AuthApi,
        credentials: &LoginInput,
    ) -> Result<Operator, ClinicError> {
        let generation = self.next_generation().await;

        let result = async {
            let tokens = auth.login(credentials).await?;
            let operator = auth.current_operator(&tokens.access_token).await?;
            Ok::<_, ClinicError>((tokens, operator))
        }
        .await;

        match result {
            Ok((tokens, operator)) => {
                tracing::info!(operator_id = operator.id, role = ?operator.role, "Logged in to clinic API");
                self.settle(generation, Some((tokens, operator.clone()))).await;
                Ok(operator)
            }
            Err(e) => {
                tracing::warn!(error = %e, username = %credentials.username, "Login to clinic API failed");
                self.settle(generation, None).await;
                Err(e)
            }
        }
    }

    pub async fn logout(&self) {
        let mut inner = self.inner.write().await;
        inner.generation += 1;
        inner.tokens = None;
        inner.state = SessionState::Anonymous;
        tracing::info!("Clinic API session cleared");
    }

    /// Exchanges the refresh token for a new access token. Failure drops the
    /// session to `Anonymous`.
    pub async fn refresh(&self, auth: &dyn AuthApi) -> Result<String, ClinicError> {
        let (generation, refresh_token) = {
            let inner = self.inner.read().await;
            let token = inner.tokens.as_ref().and_then(|t| t.refresh_token.clone());
            (inner.generation, token)
        };

        let refresh_token = refresh_token.ok_or(ClinicError::Unauthorized)?;

        match auth.refresh(&refresh_token).await {
            Ok(tokens) => {
                let mut inner = self.inner.write().await;
                if inner.generation == generation {
                    inner.tokens = Some(TokenPair {
                        refresh_token: tokens.refresh_token.or(Some(refresh_token)),
                        access_token: tokens.access_token.clone(),
                    });
                }
                tracing::debug!("Access token refreshed");
                Ok(tokens.access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Access token refresh failed");
                let mut inner = self.inner.write().await;
                if inner.generation == generation {
                    inner.tokens = None;
                    inner.state = SessionState::Anonymous;
                }
                Err(e)
            }
        }
    }

    /// Access token for the next request, refreshed first when it is about to expire.
    pub async fn usable_access_token(&self, auth: &dyn AuthApi) -> Option<String> {
        let token = self.access_token().await?;
        if token_expired(&token, chrono::Utc::now().timestamp()) {
            return self.refresh(auth).await.ok();
        }
        Some(token)
    }

    async fn next_generation(&self) -> u64 {
        let mut inner = self.inner.write().await;
        inner.generation += 1;
        inner.generation
    }

    async fn settle(&self, generation: u64, outcome: Option<(TokenPair, Operator)>) -> SessionState {
        let mut inner = self.inner.write().await;
        if inner.generation != generation {
            tracing::debug!(generation, current = inner.generation, "Discarding superseded session result");
            return inner.state.clone();
        }

        match outcome {
            Some((tokens, operator)) => {
                inner.tokens = Some(tokens);
                inner.state = SessionState::Authenticated(operator);
            }
            None => {
                inner.tokens = None;
                inner.state = SessionState::Anonymous;
            }
        }
        inner.state.clone()
    }
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

/// Reads the `exp` claim of a JWT access token. Tokens that cannot be read
/// are left for the server to judge.
pub fn token_expired(token: &str, now: i64) -> bool {
    let Some(payload) = token.split('.').nth(1) else {
        return false;
    };
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) else {
        return false;
    };
    match serde_json::from_slice::<ExpiryClaim>(&bytes) {
        Ok(ExpiryClaim { exp: Some(exp) }) => exp <= now + EXPIRY_SKEW_SECS,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    struct FakeAuth {
        refresh_ok: bool,
        refresh_started: Notify,
        refresh_gate: Option<Notify>,
        refresh_calls: AtomicUsize,
    }

    impl FakeAuth {
        fn new(refresh_ok: bool) -> Self {
            Self {
                refresh_ok,
                refresh_started: Notify::new(),
                refresh_gate: None,
                refresh_calls: AtomicUsize::new(0),
            }
        }

        fn gated() -> Self {
            Self {
                refresh_gate: Some(Notify::new()),
                ..Self::new(true)
            }
        }
    }

    fn operator(id: i32, name: &str, role: Role) -> Operator {
        Operator {
            id,
            full_name: name.to_string(),
            role,
        }
    }

    #[async_trait]
    impl AuthApi for FakeAuth {
        async fn login(&self, credentials: &LoginInput) -> Result<TokenPair, ClinicError> {
            if credentials.password != "secret" {
                return Err(ClinicError::Status {
                    status: 400,
                    message: Some("Sai mật khẩu".to_string()),
                });
            }
            Ok(TokenPair {
                access_token: "login-access".to_string(),
                refresh_token: Some("login-refresh".to_string()),
            })
        }

        async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClinicError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.refresh_started.notify_one();
            if let Some(gate) = &self.refresh_gate {
                gate.notified().await;
            }
            if !self.refresh_ok {
                return Err(ClinicError::Unauthorized);
            }
            Ok(TokenPair {
                access_token: format!("access-from-{}", refresh_token),
                refresh_token: None,
            })
        }

        async fn current_operator(&self, access_token: &str) -> Result<Operator, ClinicError> {
            if access_token == "login-access" {
                Ok(operator(2, "Phạm Thu Hà", Role::Receptionist))
            } else {
                Ok(operator(1, "Quản trị viên", Role::Admin))
            }
        }
    }

    #[tokio::test]
    async fn test_restore_without_token_is_anonymous() {
        let session = Session::new();
        assert_eq!(session.state().await, SessionState::Unknown);

        let state = session.restore(&FakeAuth::new(true), None).await;
        assert_eq!(state, SessionState::Anonymous);
        assert_eq!(session.access_token().await, None);
    }

    #[tokio::test]
    async fn test_restore_with_valid_token_authenticates() {
        let session = Session::new();
        let state = session
            .restore(&FakeAuth::new(true), Some("stored".to_string()))
            .await;

        assert_eq!(state, SessionState::Authenticated(operator(1, "Quản trị viên", Role::Admin)));
        assert_eq!(session.access_token().await.as_deref(), Some("access-from-stored"));
    }

    #[tokio::test]
    async fn test_restore_with_rejected_token_is_anonymous() {
        let session = Session::new();
        let state = session
            .restore(&FakeAuth::new(false), Some("stale".to_string()))
            .await;
        assert_eq!(state, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_login_during_restore_wins() {
        let session = Arc::new(Session::new());
        let auth = Arc::new(FakeAuth::gated());

        let restoring = {
            let session = session.clone();
            let auth = auth.clone();
            tokio::spawn(async move { session.restore(auth.as_ref(), Some("stored".to_string())).await })
        };

        auth.refresh_started.notified().await;
        assert_eq!(session.state().await, SessionState::Restoring);

        let credentials = LoginInput {
            username: "letan".to_string(),
            password: "secret".to_string(),
        };
        let logged_in = session.login(auth.as_ref(), &credentials).await.unwrap();
        assert_eq!(logged_in.role, Role::Receptionist);

        if let Some(gate) = &auth.refresh_gate {
            gate.notify_one();
        }
        let restored = restoring.await.unwrap();

        assert_eq!(restored, SessionState::Authenticated(logged_in.clone()));
        assert_eq!(session.operator().await, Some(logged_in));
        assert_eq!(session.access_token().await.as_deref(), Some("login-access"));
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session_anonymous() {
        let session = Session::new();
        let credentials = LoginInput {
            username: "letan".to_string(),
            password: "wrong".to_string(),
        };
        let err = session.login(&FakeAuth::new(true), &credentials).await.unwrap_err();
        assert_eq!(err.server_message(), Some("Sai mật khẩu"));
        assert_eq!(session.state().await, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_refresh_keeps_previous_refresh_token() {
        let session = Session::new();
        let auth = FakeAuth::new(true);
        session.restore(&auth, Some("stored".to_string())).await;

        let token = session.refresh(&auth).await.unwrap();
        assert_eq!(token, "access-from-stored");
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_drops_session() {
        let session = Session::new();
        session.restore(&FakeAuth::new(true), Some("stored".to_string())).await;

        let result = session.refresh(&FakeAuth::new(false)).await;
        assert!(result.is_err());
        assert_eq!(session.state().await, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_logout_clears_tokens() {
        let session = Session::new();
        session.restore(&FakeAuth::new(true), Some("stored".to_string())).await;
        session.logout().await;
        assert_eq!(session.state().await, SessionState::Anonymous);
        assert_eq!(session.access_token().await, None);
    }

    fn jwt_with_exp(exp: i64) -> String {
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"1","exp":{}}}"#, exp));
        format!("eyJhbGciOiJIUzI1NiJ9.{}.signature", payload)
    }

    #[test]
    fn test_token_expired_reads_exp_claim() {
        let now = 1_800_000_000;
        assert!(token_expired(&jwt_with_exp(now - 10), now));
        assert!(token_expired(&jwt_with_exp(now + 10), now));
        assert!(!token_expired(&jwt_with_exp(now + 3600), now));
    }

    #[test]
    fn test_opaque_tokens_are_not_expired() {
        assert!(!token_expired("opaque-token", 0));
        assert!(!token_expired("a.!!!.c", 0));
    }
}
