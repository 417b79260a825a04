use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use super::client::GeminiClient;

/// Delay between polls of a pending video operation
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Give up after this many polls (10 minutes at the 5s interval)
const MAX_POLLS: u32 = 120;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Operation {
    name: String,
    done: bool,
    error: Option<OperationError>,
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OperationError {
    message: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct OperationResponse {
    generate_video_response: GenerateVideoResponse,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GenerateVideoResponse {
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct GeneratedSample {
    video: VideoRef,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct VideoRef {
    uri: String,
}

impl GeminiClient {
    /// Animate a scene image into a short video.
    ///
    /// Submits one long-running operation and re-polls it until completion;
    /// the request is never resubmitted. Returns a downloadable asset URI.
    pub async fn generate_video(
        &self,
        image_base64: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<String> {
        let body = json!({
            "instances": [{
                "prompt": prompt,
                "image": {
                    "bytesBase64Encoded": image_base64,
                    "mimeType": mime_type,
                },
            }],
            "parameters": {
                "sampleCount": 1,
                "resolution": "720p",
                "aspectRatio": "16:9",
            },
        });

        let path = format!("models/{}:predictLongRunning", self.settings.video_model);
        let submitted: Operation = serde_json::from_value(self.post_json(&path, &body).await?)
            .context("Unexpected video operation response shape")?;

        if submitted.name.is_empty() {
            anyhow::bail!("Video generation did not return an operation name");
        }

        info!("Video operation submitted: {}", submitted.name);

        let name = submitted.name.clone();
        let mut operation = submitted;
        let mut polls = 0u32;

        while !operation.done {
            polls += 1;
            if polls > MAX_POLLS {
                anyhow::bail!("Video generation timed out after {} polls", MAX_POLLS);
            }

            tokio::time::sleep(POLL_INTERVAL).await;

            operation = serde_json::from_value(self.get_json(&name).await?)
                .context("Unexpected video operation response shape")?;
        }

        if let Some(error) = operation.error {
            anyhow::bail!("Video generation failed: {}", error.message);
        }

        let uri = operation
            .response
            .and_then(|r| r.generate_video_response.generated_samples.into_iter().next())
            .map(|sample| sample.video.uri)
            .filter(|uri| !uri.is_empty())
            .context("Video generation failed to produce a URI")?;

        // The download link requires the API key appended
        Ok(format!("{}&key={}", uri, self.settings.api_key))
    }
}
