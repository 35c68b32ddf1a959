use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::time::Duration;

use super::ClinicError;

/// Thin JSON transport over reqwest for the clinic API.
#[derive(Clone, Debug)]
pub struct Transport {
    http: reqwest::Client,
    base_url: String,
}

/// Upstream responses are either bare or wrapped in `{ "data": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl Transport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClinicError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClinicError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends one request and returns the raw body of a 2xx response.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<String, ClinicError> {
        let url = format!("{}{}", self.base_url, path);

        tracing::debug!(%method, path, "Calling clinic API");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header("Accept", "application/json");

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, %method, path, "Failed to call clinic API");
            ClinicError::from(e)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            tracing::error!(error = %e, %method, path, "Failed to read clinic API response");
            ClinicError::from(e)
        })?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(%method, path, "Clinic API rejected the access token");
            return Err(ClinicError::Unauthorized);
        }

        if !status.is_success() {
            let message = extract_error_message(&text);
            tracing::error!(status = %status, %method, path, message = ?message, "Clinic API returned error");
            return Err(ClinicError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(text)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<T, ClinicError> {
        let body = self.send(Method::GET, path, token, None).await?;
        decode(&body)
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        payload: &Value,
    ) -> Result<T, ClinicError> {
        let body = self.send(Method::POST, path, token, Some(payload)).await?;
        decode(&body)
    }
}

/// Decodes a response body, unwrapping the `data` envelope when present.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ClinicError> {
    let envelope: Envelope<T> = serde_json::from_str(body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse clinic API response");
        ClinicError::Decode(e.to_string())
    })?;

    Ok(match envelope {
        Envelope::Wrapped { data } => data,
        Envelope::Bare(value) => value,
    })
}

/// Pulls a human-readable message out of an error body (`message` or `error`).
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|msg| !msg.is_empty())
        .map(str::to_string)
}
