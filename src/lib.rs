pub mod audio;
pub mod config;
pub mod http;
pub mod live;
pub mod services;
pub mod session;
pub mod transcript;

pub use audio::{
    AudioBackend, AudioFrame, AudioSegment, CaptureConfig, FrameChunker, MicrophoneBackend,
    PlaybackScheduler, PlaybackSink, SegmentId, SpeakerSink,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use live::{GeminiLive, LiveApi, LiveConnection, LiveEvent, LiveSetup};
pub use services::{EditedImage, GeminiClient, SearchResult, SearchSource};
pub use session::{SessionConfig, SessionState, SessionStats, TutorSession};
pub use transcript::{Speaker, TranscriptLog, TranscriptTurn};
