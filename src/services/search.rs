use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;

use super::client::{GeminiClient, GenerateContentResponse};

/// A web source backing part of a grounded answer
#[derive(Debug, Clone, Serialize)]
pub struct SearchSource {
    pub uri: String,
    pub title: String,
}

/// A grounded search answer with its citations, in ranking order
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub text: String,
    pub sources: Vec<SearchSource>,
}

impl GeminiClient {
    /// Answer a free-text cultural query, grounded in web search results
    pub async fn search(&self, query: &str) -> Result<SearchResult> {
        let body = json!({
            "contents": [{ "parts": [{ "text": query }] }],
            "tools": [{ "googleSearch": {} }],
        });

        let path = format!("models/{}:generateContent", self.settings.search_model);
        let raw = self.post_json(&path, &body).await?;

        let response: GenerateContentResponse =
            serde_json::from_value(raw).context("Unexpected search response shape")?;

        let mut text = String::new();
        let mut sources = Vec::new();

        for candidate in response.candidates {
            if let Some(content) = candidate.content {
                for part in content.parts {
                    if let Some(fragment) = part.text {
                        text.push_str(&fragment);
                    }
                }
            }
            if let Some(grounding) = candidate.grounding_metadata {
                for chunk in grounding.grounding_chunks {
                    if let Some(web) = chunk.web {
                        sources.push(SearchSource {
                            uri: web.uri,
                            title: web.title,
                        });
                    }
                }
            }
        }

        if text.is_empty() {
            text = "No information found.".to_string();
        }

        Ok(SearchResult { text, sources })
    }
}
