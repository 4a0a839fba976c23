//! Router configuration.
//!
//! This module creates the Axum router serving all mock endpoints.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ui;

/// Creates the main application router.
///
/// All routes live below the configured context path. The realm is a path
/// parameter, so any realm name works without prior registration.
pub fn create_router(state: AppState) -> Router {
    let context_path = state.config.normalized_context_path();

    let realm_routes = Router::new()
        .route(
            "/realms/{realm}/protocol/openid-connect/auth",
            get(ui::login_page),
        )
        .route(
            "/realms/{realm}/protocol/openid-connect/authenticate/{session_id}",
            post(ui::authenticate),
        )
        .route(
            "/realms/{realm}/protocol/openid-connect/token",
            post(handlers::token),
        )
        .route(
            "/realms/{realm}/protocol/openid-connect/token/introspect",
            post(handlers::introspect),
        )
        .route(
            "/realms/{realm}/protocol/openid-connect/certs",
            get(handlers::certs),
        )
        .route(
            "/realms/{realm}/protocol/openid-connect/logout",
            get(handlers::logout).post(handlers::logout),
        )
        .route(
            "/realms/{realm}/protocol/openid-connect/oob",
            get(ui::out_of_band_page),
        )
        .route(
            "/realms/{realm}/.well-known/openid-configuration",
            get(handlers::well_known),
        )
        .with_state(state);

    let app = if context_path.is_empty() {
        realm_routes
    } else {
        Router::new().nest(&context_path, realm_routes)
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    app.layer(TraceLayer::new_for_http()).layer(cors)
}
