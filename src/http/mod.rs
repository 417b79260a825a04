//! HTTP API for the browser front end
//!
//! This module provides a REST API for the application's screens:
//! - POST /session/start - Start the live tutor session
//! - POST /session/stop - Stop it and return final stats
//! - GET /session/status - Query session state
//! - GET /session/transcript - Get the accumulated transcript
//! - POST /images/edit - Edit a scene image
//! - POST /search - Grounded cultural search
//! - POST /videos/generate - Animate a scene image (long-running)
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
