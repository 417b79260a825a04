use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::services::GeminiClient;
use crate::session::TutorSession;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Client for the generation services (images, search, video)
    pub gemini: Arc<GeminiClient>,

    /// The single live session slot; at most one session holds the
    /// microphone and audio devices at a time
    pub session: Arc<RwLock<Option<Arc<TutorSession>>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let gemini = Arc::new(GeminiClient::new(config.gemini.clone()));

        Self {
            config: Arc::new(config),
            gemini,
            session: Arc::new(RwLock::new(None)),
        }
    }
}
