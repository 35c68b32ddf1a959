use std::env;
use std::time::Duration;

use crate::models::LoginInput;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub clinic_api_url: String,
    pub desk_api_key: String,
    pub refresh_token: Option<String>,
    pub credentials: Option<LoginInput>,
    pub request_timeout: Duration,
    pub bind_addr: String,
    pub cors_origin: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let clinic_api_url = get("CLINIC_API_URL").ok_or("CLINIC_API_URL must be set")?;
        if !clinic_api_url.starts_with("http://") && !clinic_api_url.starts_with("https://") {
            return Err(format!("CLINIC_API_URL must be an http(s) URL, got {}", clinic_api_url));
        }

        let desk_api_key = get("DESK_API_KEY").ok_or("DESK_API_KEY must be set")?;

        let credentials = match (get("CLINIC_USERNAME"), get("CLINIC_PASSWORD")) {
            (Some(username), Some(password)) => Some(LoginInput { username, password }),
            (None, None) => None,
            _ => return Err("CLINIC_USERNAME and CLINIC_PASSWORD must be set together".to_string()),
        };

        let timeout_secs = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| format!("REQUEST_TIMEOUT_SECS must be a positive integer, got {}", raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            clinic_api_url,
            desk_api_key,
            refresh_token: get("CLINIC_REFRESH_TOKEN"),
            credentials,
            request_timeout: Duration::from_secs(timeout_secs),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CLINIC_API_URL", "https://clinic.example.vn/api"),
            ("DESK_API_KEY", "desk-key"),
        ]))
        .unwrap();

        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert!(config.credentials.is_none());
        assert!(config.refresh_token.is_none());
    }

    #[test]
    fn test_missing_required_values() {
        let err = AppConfig::from_lookup(lookup(&[("DESK_API_KEY", "k")])).unwrap_err();
        assert!(err.contains("CLINIC_API_URL"));

        let err = AppConfig::from_lookup(lookup(&[
            ("CLINIC_API_URL", "https://clinic.example.vn"),
            ("DESK_API_KEY", "   "),
        ]))
        .unwrap_err();
        assert!(err.contains("DESK_API_KEY"));
    }

    #[test]
    fn test_rejects_half_credentials_and_bad_timeout() {
        let base = [
            ("CLINIC_API_URL", "http://localhost:5000"),
            ("DESK_API_KEY", "k"),
        ];

        let mut half = base.to_vec();
        half.push(("CLINIC_USERNAME", "letan"));
        assert!(AppConfig::from_lookup(lookup(&half)).is_err());

        let mut zero = base.to_vec();
        zero.push(("REQUEST_TIMEOUT_SECS", "0"));
        assert!(AppConfig::from_lookup(lookup(&zero)).is_err());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = AppConfig::from_lookup(lookup(&[
            ("CLINIC_API_URL", "clinic.example.vn"),
            ("DESK_API_KEY", "k"),
        ]))
        .unwrap_err();
        assert!(err.contains("http(s)"));
    }
}
