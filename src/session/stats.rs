use chrono::{DateTime, Utc};
use serde::Serialize;

use super::controller::SessionState;

/// Snapshot of a live tutor session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Session identifier
    pub session_id: String,

    /// Current lifecycle state
    pub state: SessionState,

    /// User-visible error message, if the session errored
    pub error: Option<String>,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Seconds since the session was created
    pub duration_secs: f64,

    /// Microphone frames forwarded to the remote model
    pub frames_sent: usize,

    /// Transcript turns accumulated so far
    pub transcript_turns: usize,

    /// Playback segments scheduled but not yet finished
    pub active_segments: usize,
}
