use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::audio::codec;
use crate::session::{DEFAULT_LIVE_MODEL, DEFAULT_SYSTEM_INSTRUCTION};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub gemini: GeminiSettings,
    pub audio: AudioSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub bind: String,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "lingua-live".to_string(),
            bind: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    /// API key; prefer supplying it via the environment
    pub api_key: String,
    pub live_model: String,
    pub image_model: String,
    pub search_model: String,
    pub video_model: String,
    pub system_instruction: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            live_model: DEFAULT_LIVE_MODEL.to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            search_model: "gemini-2.5-flash".to_string(),
            video_model: "veo-3.1-fast-generate-preview".to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Microphone sample rate on the wire
    pub input_sample_rate: u32,
    /// Assistant speech sample rate
    pub output_sample_rate: u32,
    /// Samples per outbound frame
    pub frame_samples: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            input_sample_rate: codec::INPUT_SAMPLE_RATE,
            output_sample_rate: codec::OUTPUT_SAMPLE_RATE,
            frame_samples: 4096,
        }
    }
}

impl Config {
    /// Load configuration from an optional file plus `LINGUA_*` environment
    /// overrides (e.g. `LINGUA_GEMINI__API_KEY`)
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("LINGUA").separator("__"))
            .build()?;

        let mut cfg: Config = settings.try_deserialize()?;

        // Conventional fallback used by the vendor tooling
        if cfg.gemini.api_key.is_empty() {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                cfg.gemini.api_key = key;
            }
        }

        Ok(cfg)
    }
}
