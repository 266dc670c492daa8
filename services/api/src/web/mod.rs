pub mod auth;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod view;
pub mod ws_handler;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Re-export the main handlers to make them easily accessible
// to the binary that builds the web server.
pub use middleware::{attach_identity, require_auth};
pub use rest::{events_handler, schedule_handler, transport_handler, ApiDoc};
pub use state::AppState;
pub use ws_handler::ws_handler;

/// Builds the complete application router: REST, WebSocket and Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/events", get(events_handler))
        .route("/transport", get(transport_handler));

    // Guests are welcome; a signed-in browser gets its identity attached.
    let session_routes = Router::new()
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            attach_identity,
        ));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/schedule", get(schedule_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(protected_routes)
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
