use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use super::state::AppState;
use crate::audio::{CaptureConfig, MicrophoneBackend, SpeakerSink};
use crate::live::GeminiLive;
use crate::services::{EditedImage, SearchResult};
use crate::session::{SessionConfig, SessionState, SessionStats, TutorSession};
use crate::transcript::TranscriptTurn;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,

    /// Override the configured assistant persona
    pub system_instruction: Option<String>,

    /// Override the configured live model
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub state: SessionState,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct EditImageRequest {
    pub image_base64: String,
    pub mime_type: String,
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateVideoRequest {
    pub image_base64: String,
    pub mime_type: String,
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateVideoResponse {
    pub video_uri: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Session handlers
// ============================================================================

/// POST /session/start
/// Start the live tutor session
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("session-{}", uuid::Uuid::new_v4()));

    info!("Starting live session: {}", session_id);

    // Hold the slot for the whole start so two requests cannot both
    // acquire the audio devices
    let mut slot = state.session.write().await;

    if let Some(existing) = slot.as_ref() {
        if existing.is_active().await {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: "A live session is already active".to_string(),
                }),
            )
                .into_response();
        }
    }

    let config = SessionConfig {
        session_id: session_id.clone(),
        model: req.model.unwrap_or_else(|| state.config.gemini.live_model.clone()),
        system_instruction: req
            .system_instruction
            .unwrap_or_else(|| state.config.gemini.system_instruction.clone()),
        output_sample_rate: state.config.audio.output_sample_rate,
    };

    let capture = CaptureConfig {
        sample_rate: state.config.audio.input_sample_rate,
        frame_samples: state.config.audio.frame_samples,
    };

    let session = Arc::new(TutorSession::new(
        config,
        Arc::new(GeminiLive::new(state.config.gemini.api_key.clone())),
        Box::new(MicrophoneBackend::new(capture)),
        Box::new(SpeakerSink::new(state.config.audio.output_sample_rate)),
    ));

    if let Err(e) = session.start().await {
        error!("Failed to start session: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response();
    }

    *slot = Some(Arc::clone(&session));

    (
        StatusCode::OK,
        Json(StartSessionResponse {
            session_id,
            state: session.state().await,
            message: "Session starting".to_string(),
        }),
    )
        .into_response()
}

/// POST /session/stop
/// Stop the live tutor session
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = {
        let mut slot = state.session.write().await;
        slot.take()
    };

    match session {
        Some(session) => match session.stop().await {
            Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
            Err(e) => {
                error!("Failed to stop session: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: e.to_string(),
                    }),
                )
                    .into_response()
            }
        },
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No live session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /session/status
/// Current session statistics
pub async fn session_status(State(state): State<AppState>) -> impl IntoResponse {
    let slot = state.session.read().await;

    match slot.as_ref() {
        Some(session) => {
            let stats: SessionStats = session.stats().await;
            (StatusCode::OK, Json(stats)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No live session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /session/transcript
/// Transcript accumulated so far
pub async fn session_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let slot = state.session.read().await;

    match slot.as_ref() {
        Some(session) => {
            let transcript: Vec<TranscriptTurn> = session.transcript().await;
            (StatusCode::OK, Json(transcript)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No live session".to_string(),
            }),
        )
            .into_response(),
    }
}

// ============================================================================
// Generation handlers
// ============================================================================

/// POST /images/edit
/// Edit a scene image with a text instruction
pub async fn edit_image(
    State(state): State<AppState>,
    Json(req): Json<EditImageRequest>,
) -> impl IntoResponse {
    match state
        .gemini
        .edit_image(&req.image_base64, &req.mime_type, &req.prompt)
        .await
    {
        Ok(image) => {
            let edited: EditedImage = image;
            (StatusCode::OK, Json(edited)).into_response()
        }
        Err(e) => {
            error!("Image edit failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /search
/// Grounded cultural search
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> impl IntoResponse {
    match state.gemini.search(&req.query).await {
        Ok(result) => {
            let result: SearchResult = result;
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => {
            error!("Search failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /videos/generate
/// Animate a scene image; responds once the long-running operation
/// completes
pub async fn generate_video(
    State(state): State<AppState>,
    Json(req): Json<GenerateVideoRequest>,
) -> impl IntoResponse {
    let prompt = req
        .prompt
        .unwrap_or_else(|| "Animate this scene naturally".to_string());

    match state
        .gemini
        .generate_video(&req.image_base64, &req.mime_type, &prompt)
        .await
    {
        Ok(video_uri) => (StatusCode::OK, Json(GenerateVideoResponse { video_uri })).into_response(),
        Err(e) => {
            error!("Video generation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
