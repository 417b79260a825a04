use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;

use super::client::{GeminiClient, GenerateContentResponse};

/// Result of an image edit: the generated image as base64 plus its MIME type
#[derive(Debug, Clone, Serialize)]
pub struct EditedImage {
    pub data_base64: String,
    pub mime_type: String,
}

impl GeminiClient {
    /// Edit a scene image: inline image + instruction in, image out
    pub async fn edit_image(
        &self,
        image_base64: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<EditedImage> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "inlineData": { "mimeType": mime_type, "data": image_base64 } },
                    { "text": prompt },
                ],
            }],
            "generationConfig": { "responseModalities": ["IMAGE"] },
        });

        let path = format!("models/{}:generateContent", self.settings.image_model);
        let raw = self.post_json(&path, &body).await?;

        let response: GenerateContentResponse =
            serde_json::from_value(raw).context("Unexpected image edit response shape")?;

        let image = response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|part| part.inline_data);

        match image {
            Some(inline) => Ok(EditedImage {
                data_base64: inline.data,
                mime_type: inline.mime_type,
            }),
            None => anyhow::bail!("No image generated"),
        }
    }
}
