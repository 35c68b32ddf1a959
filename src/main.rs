mod client;
mod config;
mod error;
mod extractors;
mod handlers;
mod middleware;
mod models;
mod openapi;
mod preview;
mod registry;
mod session;
mod startup;
mod workflow;

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use handlers::metrics::MetricsState;

use client::{AuthApi, HttpClinicApi, Transport};
use registry::ShiftRegistry;
use session::{Session, SessionState};
use workflow::WorkflowBoard;

pub struct AppState {
    pub board: WorkflowBoard,
    pub session: Arc<Session>,
    pub auth: Arc<dyn AuthApi>,
    pub config: AppConfig,
    pub metrics: Arc<MetricsState>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with conditional JSON/text output
    let use_json = std::env::var("LOG_FORMAT")
        .unwrap_or_else(|_| "text".to_string()) == "json";

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,clinic_shift_desk=debug,tower_http=debug".into());

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        // Human-readable for development
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration error: {}", e);
        e
    })?;

    let metrics_state = Arc::new(handlers::metrics::setup_metrics_recorder()?);
    tracing::info!("Metrics recorder initialized");

    let transport = Transport::new(&config.clinic_api_url, config.request_timeout)?;
    let session = Arc::new(Session::new());

    // Stored refresh token first, configured credentials as the fallback
    let restored = session.restore(&transport, config.refresh_token.clone()).await;
    if restored == SessionState::Anonymous {
        if let Some(credentials) = &config.credentials {
            if let Err(e) = session.login(&transport, credentials).await {
                tracing::warn!(error = %e, "Desk starts without a clinic session");
            }
        }
    }

    let auth: Arc<dyn AuthApi> = Arc::new(transport.clone());
    let api = Arc::new(HttpClinicApi::new(transport, session.clone()));

    // A failed first load is not fatal; the operator can reload
    let mut registry = ShiftRegistry::new();
    if let Err(e) = registry.load_all(api.as_ref(), config.request_timeout).await {
        tracing::error!(error = %e, "Initial doctor-shift load failed, starting with an empty registry");
    }

    let board = WorkflowBoard::new(api, registry, config.request_timeout);
    let bind_addr = config.bind_addr.clone();

    // Create application state
    let state = Arc::new(AppState {
        board,
        session,
        auth,
        config,
        metrics: metrics_state,
    });

    // Build router
    let app = startup::build_router(state);

    // Start server
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
