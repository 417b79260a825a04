use serde::{Deserialize, Serialize};

use crate::audio::codec;

/// Default live conversation model
pub const DEFAULT_LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";

/// Default assistant persona
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a friendly and patient language \
tutor named 'Sasha'. You help the user practice conversation. Correct them gently if \
they make mistakes, but prioritize flowing conversation. Keep responses relatively \
concise.";

/// Configuration for one live tutor session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Live conversation model identifier
    pub model: String,

    /// System prompt configuring the assistant persona
    pub system_instruction: String,

    /// Sample rate of assistant speech returned by the model
    pub output_sample_rate: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            model: DEFAULT_LIVE_MODEL.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            output_sample_rate: codec::OUTPUT_SAMPLE_RATE,
        }
    }
}
