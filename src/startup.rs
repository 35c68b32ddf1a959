use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    response::Html,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::{
    handlers,
    middleware::{
        metrics_middleware, request_id_middleware, require_desk_key, DESK_KEY_HEADER,
        REQUEST_ID_HEADER,
    },
    openapi::ApiDoc,
};

pub fn build_router(state: Arc<crate::AppState>) -> Router {
    // CORS configuration
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(DESK_KEY_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)]);

    match state.config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(e) => tracing::warn!(origin = %state.config.cors_origin, error = %e, "Invalid CORS_ORIGIN, cross-origin requests disabled"),
    }

    // Doctor-shift routes
    let doctor_shift_routes = Router::new()
        .route("/", get(handlers::doctor_shifts_handler::list_doctor_shifts))
        .route("/reload", post(handlers::doctor_shifts_handler::reload_doctor_shifts))
        .route("/week", get(handlers::doctor_shifts_handler::get_week_grid))
        // Cancellation workflow
        .route(
            "/{id}/cancellation",
            get(handlers::cancellation_handler::get_cancellation)
                .post(handlers::cancellation_handler::select_for_cancellation)
                .delete(handlers::cancellation_handler::abandon_cancellation),
        )
        .route("/{id}/cancellation/reason", put(handlers::cancellation_handler::enter_reason))
        .route("/{id}/cancellation/confirm", post(handlers::cancellation_handler::confirm_cancellation))
        .route("/{id}/cancellation/retry", post(handlers::cancellation_handler::retry_cancellation))
        // Restore workflow
        .route(
            "/{id}/restore",
            get(handlers::restore_handler::get_restore)
                .post(handlers::restore_handler::begin_restore)
                .delete(handlers::restore_handler::abandon_restore),
        )
        .route("/{id}/restore/confirm", post(handlers::restore_handler::confirm_restore));

    // Everything under /api requires the desk key
    let api_routes = Router::new()
        .route(
            "/session",
            get(handlers::session_handler::get_session)
                .post(handlers::session_handler::login)
                .delete(handlers::session_handler::logout),
        )
        .nest("/doctor-shifts", doctor_shift_routes)
        .layer(middleware::from_fn_with_state(state.clone(), require_desk_key));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics::metrics_handler))
        .nest("/api", api_routes)
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .route("/swagger-ui", get(swagger_ui))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

async fn swagger_ui() -> Html<&'static str> {
    Html(r#"
<!DOCTYPE html>
<html lang="vi">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Clinic Shift Desk API</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = () => {
            window.ui = SwaggerUIBundle({
                url: '/api-docs/openapi.json',
                dom_id: '#swagger-ui'
            });
        };
    </script>
</body>
</html>
    "#)
}
