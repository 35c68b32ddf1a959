use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

use crate::AppState;

pub struct MetricsState {
    pub handle: PrometheusHandle,
}

fn builder() -> Result<PrometheusBuilder, String> {
    // Upstream calls are bounded by the request timeout, so buckets stop at 30s
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("desk_http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        )
        .map_err(|e| format!("Failed to set histogram buckets: {}", e))
}

/// Set up and install the global Prometheus metrics recorder
pub fn setup_metrics_recorder() -> Result<MetricsState, String> {
    let handle = builder()?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;

    Ok(MetricsState { handle })
}

/// Recorder handle that is not installed globally, for tests
#[cfg(test)]
pub fn detached_metrics_state() -> MetricsState {
    let recorder = PrometheusBuilder::new().build_recorder();
    MetricsState {
        handle: recorder.handle(),
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, state.metrics.handle.render())
}
