//! Router configuration for the web server.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        // Documents
        .route(
            "/api/tenants/:tenant/documents",
            get(handlers::list_documents).post(handlers::archive_document),
        )
        .route(
            "/api/tenants/:tenant/documents/:id",
            get(handlers::show_document).delete(handlers::discard_document),
        )
        .route(
            "/api/tenants/:tenant/documents/:id/approve",
            post(handlers::approve_document),
        )
        .route(
            "/api/tenants/:tenant/documents/:id/reject",
            post(handlers::reject_document),
        )
        .route(
            "/api/tenants/:tenant/documents/:id/download-url",
            get(handlers::download_url),
        )
        .route(
            "/api/tenants/:tenant/documents/:id/preview",
            get(handlers::preview_document),
        )
        // Generation requests
        .route(
            "/api/tenants/:tenant/requests",
            post(handlers::request_generation),
        )
        // Templates
        .route("/api/tenants/:tenant/templates", get(handlers::list_templates))
        .route(
            "/api/tenants/:tenant/templates/:id",
            get(handlers::show_template).put(handlers::save_template),
        )
        // Letterhead
        .route(
            "/api/tenants/:tenant/profile",
            get(handlers::show_profile).put(handlers::save_profile),
        )
        .route(
            "/api/tenants/:tenant/profile/logo",
            put(handlers::replace_logo),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
