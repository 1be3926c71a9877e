//! Route definitions

use super::cors::CorsPolicy;
use super::handlers;
use super::middleware::{make_span, request_id};
use super::state::AppState;
use crate::config::SettingsError;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Result<Router, SettingsError> {
    let cors = CorsPolicy::from_settings(&state.settings.cors)?;

    let router = Router::new()
        // Service routes
        .route("/", get(handlers::index))
        .route("/hello", get(handlers::hello))
        .route("/api/hello", get(handlers::hello))
        // Data source diagnostics
        .route("/test-supabase", get(handlers::test_connection))
        .route("/api/test", get(handlers::test_connection))
        .route("/test-db-language", get(handlers::test_languages))
        // Search
        .route("/search", post(handlers::search))
        .route("/api/search", post(handlers::search))
        .fallback(handlers::not_found)
        // Add middleware
        .layer(TraceLayer::new_for_http().make_span_with(make_span))
        .layer(middleware::from_fn(request_id))
        .layer(cors.layer)
        .layer(cors.methods)
        .layer(cors.headers)
        // Add state
        .with_state(state);

    Ok(router)
}
