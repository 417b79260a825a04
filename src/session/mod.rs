//! Live tutor session management
//!
//! This module provides the `TutorSession` abstraction that manages:
//! - Microphone capture and frame forwarding to the live connection
//! - Playback scheduling of returned assistant speech
//! - Transcript accumulation (user and assistant turns)
//! - Session lifecycle: connect, event routing, teardown

mod config;
mod controller;
mod stats;

pub use config::{SessionConfig, DEFAULT_LIVE_MODEL, DEFAULT_SYSTEM_INSTRUCTION};
pub use controller::{SessionState, TutorSession};
pub use stats::SessionStats;
