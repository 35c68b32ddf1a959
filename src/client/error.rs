/// Failure talking to the upstream clinic API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClinicError {
    #[error("Request to clinic API failed: {0}")]
    Network(String),

    #[error("Clinic API returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    #[error("Clinic API rejected the access token")]
    Unauthorized,

    #[error("Failed to parse clinic API response: {0}")]
    Decode(String),

    #[error("Clinic API did not respond in time")]
    Timeout,
}

impl ClinicError {
    /// Message provided by the server, if any. Shown to the operator verbatim.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClinicError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClinicError::Timeout)
    }
}

impl From<reqwest::Error> for ClinicError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClinicError::Timeout
        } else if e.is_decode() {
            ClinicError::Decode(e.to_string())
        } else {
            ClinicError::Network(e.to_string())
        }
    }
}
