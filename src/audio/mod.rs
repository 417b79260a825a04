pub mod capture;
pub mod codec;
pub mod playback;

pub use capture::{AudioBackend, AudioFrame, CaptureConfig, FrameChunker, MicrophoneBackend};
pub use codec::AudioSegment;
pub use playback::{PlaybackScheduler, PlaybackSink, SegmentId, SpeakerSink};
