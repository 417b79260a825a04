//! Remote conversational session over the Gemini Live API.
//!
//! The wire protocol is the vendor's `BidiGenerateContent` WebSocket:
//! one setup message configures the model, persona, and transcription,
//! then audio flows up as `realtimeInput` and server events flow back
//! until either side closes.

mod client;
mod messages;

pub use client::{GeminiLive, LIVE_ENDPOINT};
pub use messages::{LiveEvent, LiveSetup};

use anyhow::Result;
use tokio::sync::mpsc;

/// Outbound half of an established live session
#[async_trait::async_trait]
pub trait LiveConnection: Send {
    /// Send one encoded microphone frame; losses are not retried
    async fn send_audio(&mut self, samples: &[i16]) -> Result<()>;

    /// Close the connection; the remote side is simply dropped
    async fn close(&mut self) -> Result<()>;
}

/// Factory for live sessions, kept as a trait so the session controller
/// can be exercised without a network
#[async_trait::async_trait]
pub trait LiveApi: Send + Sync {
    /// Open a session and return the outbound handle plus the inbound
    /// event stream
    async fn connect(
        &self,
        setup: LiveSetup,
    ) -> Result<(Box<dyn LiveConnection>, mpsc::Receiver<LiveEvent>)>;
}
