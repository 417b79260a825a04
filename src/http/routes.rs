use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Live session control
        .route("/session/start", post(handlers::start_session))
        .route("/session/stop", post(handlers::stop_session))
        .route("/session/status", get(handlers::session_status))
        .route("/session/transcript", get(handlers::session_transcript))
        // Generation services
        .route("/images/edit", post(handlers::edit_image))
        .route("/search", post(handlers::search))
        .route("/videos/generate", post(handlers::generate_video))
        // Request logging, plus CORS for the browser front end
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
