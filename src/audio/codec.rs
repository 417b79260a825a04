//! PCM conversion helpers for the live session wire format.
//!
//! Outbound microphone audio is 16kHz mono 16-bit PCM, little-endian,
//! base64-encoded. Inbound assistant speech arrives as 24kHz mono 16-bit
//! PCM and is decoded into float buffers for the playback scheduler.

use anyhow::{Context, Result};
use base64::Engine;

/// Sample rate the Live API expects for microphone input
pub const INPUT_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of assistant speech returned by the Live API
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// MIME type attached to outbound audio chunks
pub const INPUT_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// A decoded buffer of assistant speech, ready to be scheduled for playback
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Mono samples in the range [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioSegment {
    /// Playback duration of this segment in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Convert a float sample to 16-bit PCM with clamping
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Flatten 16-bit PCM samples into little-endian bytes
pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Encode one outbound microphone frame as a base64 wire blob
pub fn encode_input_frame(samples: &[i16]) -> String {
    base64::engine::general_purpose::STANDARD.encode(pcm16_to_bytes(samples))
}

/// Decode a base64 audio chunk from the server into raw PCM bytes
pub fn decode_base64_chunk(data: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .context("Failed to decode base64 audio chunk")
}

/// Interpret little-endian 16-bit PCM bytes as a playable segment
pub fn segment_from_pcm16(bytes: &[u8], sample_rate: u32) -> AudioSegment {
    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    AudioSegment {
        samples,
        sample_rate,
    }
}
