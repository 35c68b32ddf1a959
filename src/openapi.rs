use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityRequirement, SecurityScheme};
use utoipa::Modify;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clinic Shift Desk API",
        version = "1.0.0",
        description = "Operator desk for cancelling and restoring doctor shifts against the clinic API"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // Health
        crate::handlers::health::health_check,

        // Session
        crate::handlers::session_handler::get_session,
        crate::handlers::session_handler::login,
        crate::handlers::session_handler::logout,

        // Doctor shifts
        crate::handlers::doctor_shifts_handler::list_doctor_shifts,
        crate::handlers::doctor_shifts_handler::reload_doctor_shifts,
        crate::handlers::doctor_shifts_handler::get_week_grid,

        // Cancellation
        crate::handlers::cancellation_handler::get_cancellation,
        crate::handlers::cancellation_handler::select_for_cancellation,
        crate::handlers::cancellation_handler::enter_reason,
        crate::handlers::cancellation_handler::confirm_cancellation,
        crate::handlers::cancellation_handler::retry_cancellation,
        crate::handlers::cancellation_handler::abandon_cancellation,

        // Restore
        crate::handlers::restore_handler::get_restore,
        crate::handlers::restore_handler::begin_restore,
        crate::handlers::restore_handler::confirm_restore,
        crate::handlers::restore_handler::abandon_restore,
    ),
    components(
        schemas(
            // Clinic models
            crate::models::Shift,
            crate::models::Doctor,
            crate::models::AssignmentStatus,
            crate::models::DoctorShiftAssignment,
            crate::models::ImpactPreview,
            crate::models::CancellationResult,
            crate::models::CancelShiftInput,
            crate::models::Operator,
            crate::models::LoginInput,
            crate::models::Role,

            // Workflows
            crate::error::WorkflowError,
            crate::workflow::CancellationWorkflow,
            crate::workflow::CancellationState,
            crate::workflow::RestoreWorkflow,
            crate::workflow::RestoreState,
            crate::session::SessionState,

            // Views
            crate::registry::WeekGrid,
            crate::registry::WeekRow,
            crate::handlers::doctor_shifts_handler::DoctorShiftView,
            crate::handlers::doctor_shifts_handler::ReloadResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check"),
        (name = "session", description = "Clinic session of the desk"),
        (name = "doctor-shifts", description = "Cached doctor-shift assignments"),
        (name = "cancellation", description = "Cancel-and-reschedule workflow"),
        (name = "restore", description = "Restore workflow for cancelled shifts"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "desk_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Desk-Key"))),
            )
        }
        openapi.security = Some(vec![SecurityRequirement::new("desk_key", Vec::<String>::new())]);
    }
}
