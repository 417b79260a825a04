use serde::{Deserialize, Serialize};

use crate::transcript::Speaker;

/// Parameters for opening a live session
#[derive(Debug, Clone)]
pub struct LiveSetup {
    /// Model identifier, e.g. "gemini-2.5-flash-native-audio-preview-09-2025"
    pub model: String,
    /// System prompt configuring the assistant persona
    pub system_instruction: String,
}

/// Inbound session events after demultiplexing
#[derive(Debug, Clone)]
pub enum LiveEvent {
    /// Connection established and setup acknowledged
    Opened,
    /// One fragment of assistant speech (raw 16-bit PCM bytes)
    Audio(Vec<u8>),
    /// One incremental transcript fragment
    Transcript { speaker: Speaker, text: String },
    /// The assistant's in-progress speech should stop immediately
    Interrupted,
    /// Remote side closed the session
    Closed,
    /// Connection failed asynchronously
    Error(String),
}

// ============================================================================
// Wire types (vendor JSON)
// ============================================================================

#[derive(Debug, Serialize)]
pub(super) struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: WireContent,
    pub output_audio_transcription: Empty,
    pub input_audio_transcription: Empty,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct Empty {}

#[derive(Debug, Serialize)]
pub(super) struct RealtimeInputMessage {
    #[serde(rename = "realtimeInput")]
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
pub(super) struct RealtimeInput {
    pub audio: AudioBlob,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AudioBlob {
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
pub(super) struct WireContent {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
pub(super) struct TextPart {
    pub text: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    pub output_transcription: Option<Transcription>,
    pub input_transcription: Option<Transcription>,
    pub interrupted: bool,
    pub turn_complete: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(super) struct ModelTurn {
    pub parts: Vec<InlinePart>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct InlinePart {
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(super) struct Transcription {
    pub text: String,
}
