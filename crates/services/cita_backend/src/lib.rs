// --- File: crates/services/cita_backend/src/lib.rs ---
pub mod app_state;
#[cfg(test)]
mod app_state_test;
pub mod service_factory;

use app_state::AppState;
use axum::{routing::get, Router};
use cita_booking::routes as booking_routes;
use tower_http::trace::TraceLayer;

/// The full HTTP surface: booking routes under `/api`, plus Swagger UI at
/// `/api/docs` when built with `openapi`.
pub fn build_router(state: &AppState) -> Router {
    let api_router = Router::new()
        .route("/", get(|| async { "Welcome to the Cita booking API!" }))
        .merge(booking_routes::routes(state.booking.clone()));

    #[allow(unused_mut)] // mutated only with the openapi feature
    let mut app = Router::new().nest("/api", api_router);

    #[cfg(feature = "openapi")]
    {
        use cita_booking::doc::BookingApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "Cita API",
                version = "0.1.0",
                description = "Appointment booking service",
                license(name = "MIT", url = "https://opensource.org/licenses/MIT")
            ),
            servers( (url = "/api", description = "Main API Prefix")),
        )]
        struct ApiDoc;

        let mut openapi_doc = ApiDoc::openapi();
        openapi_doc.merge(BookingApiDoc::openapi());
        tracing::info!("Adding Swagger UI at /api/docs");
        app = app.merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc));
    }

    app.layer(TraceLayer::new_for_http())
}
