use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use super::messages::*;
use super::{LiveApi, LiveConnection, LiveEvent, LiveSetup};
use crate::audio::codec;
use crate::transcript::Speaker;

/// Default Gemini Live API endpoint
pub const LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

type WsSink = futures::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    Message,
>;

/// Gemini Live API client
pub struct GeminiLive {
    api_key: String,
    endpoint: String,
}

impl GeminiLive {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: LIVE_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait::async_trait]
impl LiveApi for GeminiLive {
    async fn connect(
        &self,
        setup: LiveSetup,
    ) -> Result<(Box<dyn LiveConnection>, mpsc::Receiver<LiveEvent>)> {
        let url = format!("{}?key={}", self.endpoint, self.api_key);

        info!("Connecting to live session (model: {})", setup.model);

        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .context("Failed to open live session connection")?;

        let (mut ws_tx, mut ws_rx) = ws.split();

        let setup_msg = SetupMessage {
            setup: Setup {
                model: format!("models/{}", setup.model),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                },
                system_instruction: WireContent {
                    parts: vec![TextPart {
                        text: setup.system_instruction,
                    }],
                },
                output_audio_transcription: Empty {},
                input_audio_transcription: Empty {},
            },
        };

        ws_tx
            .send(Message::Text(serde_json::to_string(&setup_msg)?))
            .await
            .context("Failed to send session setup")?;

        let (events_tx, events_rx) = mpsc::channel(64);

        // Reader task: demultiplex server messages into LiveEvents until
        // the stream ends or the session drops interest (receiver closed)
        tokio::spawn(async move {
            let mut terminal_sent = false;

            while let Some(next) = ws_rx.next().await {
                let payload = match next {
                    Ok(Message::Text(text)) => text.into_bytes(),
                    Ok(Message::Binary(bytes)) => bytes,
                    Ok(Message::Close(_)) => {
                        let _ = events_tx.send(LiveEvent::Closed).await;
                        terminal_sent = true;
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = events_tx.send(LiveEvent::Error(e.to_string())).await;
                        terminal_sent = true;
                        break;
                    }
                };

                let message: ServerMessage = match serde_json::from_slice(&payload) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("Unparseable server message: {}", e);
                        continue;
                    }
                };

                let mut events = Vec::new();

                if message.setup_complete.is_some() {
                    events.push(LiveEvent::Opened);
                }

                if let Some(content) = message.server_content {
                    if let Some(t) = content.output_transcription {
                        if !t.text.is_empty() {
                            events.push(LiveEvent::Transcript {
                                speaker: Speaker::Assistant,
                                text: t.text,
                            });
                        }
                    }
                    if let Some(t) = content.input_transcription {
                        if !t.text.is_empty() {
                            events.push(LiveEvent::Transcript {
                                speaker: Speaker::User,
                                text: t.text,
                            });
                        }
                    }
                    if let Some(turn) = content.model_turn {
                        for part in turn.parts {
                            if let Some(inline) = part.inline_data {
                                match codec::decode_base64_chunk(&inline.data) {
                                    Ok(pcm) => events.push(LiveEvent::Audio(pcm)),
                                    Err(e) => warn!("Dropping audio fragment: {}", e),
                                }
                            }
                        }
                    }
                    if content.interrupted {
                        events.push(LiveEvent::Interrupted);
                    }
                }

                for event in events {
                    if events_tx.send(event).await.is_err() {
                        return; // session dropped interest
                    }
                }
            }

            if !terminal_sent {
                let _ = events_tx.send(LiveEvent::Closed).await;
            }
        });

        Ok((Box::new(GeminiLiveConnection { ws_tx }), events_rx))
    }
}

/// Outbound half of one Gemini live session
pub struct GeminiLiveConnection {
    ws_tx: WsSink,
}

#[async_trait::async_trait]
impl LiveConnection for GeminiLiveConnection {
    async fn send_audio(&mut self, samples: &[i16]) -> Result<()> {
        let msg = RealtimeInputMessage {
            realtime_input: RealtimeInput {
                audio: AudioBlob {
                    data: codec::encode_input_frame(samples),
                    mime_type: codec::INPUT_MIME_TYPE.to_string(),
                },
            },
        };

        self.ws_tx
            .send(Message::Text(serde_json::to_string(&msg)?))
            .await
            .context("Failed to send audio frame")
    }

    async fn close(&mut self) -> Result<()> {
        let _ = self.ws_tx.send(Message::Close(None)).await;
        let _ = self.ws_tx.close().await;
        Ok(())
    }
}
