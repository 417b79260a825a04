//! Live transcript accumulation.
//!
//! Incremental text fragments arrive from the session as the assistant
//! speaks and as the user's speech is recognized. Consecutive fragments
//! from the same speaker merge into one turn; a speaker change starts a
//! new turn. The log is append-only for the lifetime of a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a transcript fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One contiguous span of transcript text attributed to a single speaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub speaker: Speaker,
    pub text: String,
    /// When the first fragment of this turn arrived
    pub started_at: DateTime<Utc>,
}

/// Ordered, append-only sequence of turns for display
#[derive(Debug, Default)]
pub struct TranscriptLog {
    turns: Vec<TranscriptTurn>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment, merging it into the last turn when the speaker
    /// has not changed
    pub fn append(&mut self, speaker: Speaker, fragment: &str) {
        match self.turns.last_mut() {
            Some(turn) if turn.speaker == speaker => {
                turn.text.push_str(fragment);
            }
            _ => {
                self.turns.push(TranscriptTurn {
                    speaker,
                    text: fragment.to_string(),
                    started_at: Utc::now(),
                });
            }
        }
    }

    pub fn turns(&self) -> &[TranscriptTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
