use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::config::GeminiSettings;

/// Default Gemini REST endpoint
pub const REST_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Client for the Gemini generation services
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    pub(super) settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: REST_ENDPOINT.to_string(),
            settings,
        }
    }

    /// Override the endpoint (used by tests)
    pub fn with_base_url(settings: GeminiSettings, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            settings,
        }
    }

    pub(super) async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let url = format!(
            "{}/v1beta/{}?key={}",
            self.base_url, path, self.settings.api_key
        );

        info!("Gemini request: {}", path);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, detail);
        }

        response
            .json()
            .await
            .context("Invalid JSON in Gemini response")
    }

    pub(super) async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!(
            "{}/v1beta/{}?key={}",
            self.base_url, path, self.settings.api_key
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, detail);
        }

        response
            .json()
            .await
            .context("Invalid JSON in Gemini response")
    }
}

// ============================================================================
// Shared response shapes for generateContent calls
// ============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(super) struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct Candidate {
    pub content: Option<CandidateContent>,
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(super) struct CandidateContent {
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct ResponsePart {
    pub text: Option<String>,
    pub inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct ResponseInlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct GroundingMetadata {
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(super) struct GroundingChunk {
    pub web: Option<WebSource>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(super) struct WebSource {
    pub uri: String,
    pub title: String,
}
