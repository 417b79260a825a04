use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::audio::capture::{AudioBackend, AudioFrame};
use crate::audio::codec;
use crate::audio::playback::{PlaybackScheduler, PlaybackSink, SegmentId};
use crate::live::{LiveApi, LiveConnection, LiveEvent, LiveSetup};
use crate::transcript::{TranscriptLog, TranscriptTurn};

/// Session lifecycle state.
///
/// `idle → connecting → open → closed`, with `errored` reachable from
/// `connecting` or `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closed,
    Errored,
}

/// Resources owned exclusively by one session, released by the shared
/// cleanup routine in reverse acquisition order
struct Resources {
    backend: Option<Box<dyn AudioBackend>>,
    connection: Option<Box<dyn LiveConnection>>,
    capture_task: Option<JoinHandle<()>>,
}

/// State shared between the session handle and its background tasks
#[derive(Clone)]
struct Shared {
    state: Arc<Mutex<SessionState>>,
    error: Arc<Mutex<Option<String>>>,
    transcript: Arc<Mutex<TranscriptLog>>,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    resources: Arc<Mutex<Resources>>,
    active: Arc<AtomicBool>,
    frames_sent: Arc<AtomicUsize>,
}

impl Shared {
    async fn set_state(&self, next: SessionState) {
        *self.state.lock().await = next;
    }

    /// Record a user-visible error and enter the errored state
    async fn fail(&self, message: String) {
        error!("Session error: {}", message);
        *self.error.lock().await = Some(message);
        self.set_state(SessionState::Errored).await;
    }

    /// The shared cleanup routine.
    ///
    /// Safe to call from any state, any number of times: every release
    /// step is independently guarded by `Option::take`, and releasing an
    /// already-released resource is a no-op.
    async fn release_resources(&self) {
        self.active.store(false, Ordering::SeqCst);

        let (capture_task, connection, backend) = {
            let mut res = self.resources.lock().await;
            (
                res.capture_task.take(),
                res.connection.take(),
                res.backend.take(),
            )
        };

        // Reverse acquisition order: forwarding task, remote connection,
        // microphone, then playback
        if let Some(task) = capture_task {
            task.abort();
        }

        if let Some(mut connection) = connection {
            if let Err(e) = connection.close().await {
                warn!("Failed to close live connection: {}", e);
            }
        }

        if let Some(mut backend) = backend {
            if let Err(e) = backend.stop().await {
                warn!("Failed to stop capture backend: {}", e);
            }
        }

        self.scheduler.lock().await.close();
    }
}

/// One live bidirectional audio/text session with the remote tutor model.
///
/// At most one session may be active at a time; the HTTP layer enforces
/// this by holding a single session slot.
pub struct TutorSession {
    config: SessionConfig,
    live: Arc<dyn LiveApi>,
    shared: Shared,
    event_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    started_at: chrono::DateTime<Utc>,
}

impl TutorSession {
    /// Create a session around a live API, a capture backend, and a
    /// playback sink. Nothing is acquired until `start`.
    pub fn new(
        config: SessionConfig,
        live: Arc<dyn LiveApi>,
        backend: Box<dyn AudioBackend>,
        sink: Box<dyn PlaybackSink>,
    ) -> Self {
        Self {
            config,
            live,
            shared: Shared {
                state: Arc::new(Mutex::new(SessionState::Idle)),
                error: Arc::new(Mutex::new(None)),
                transcript: Arc::new(Mutex::new(TranscriptLog::new())),
                scheduler: Arc::new(Mutex::new(PlaybackScheduler::new(sink))),
                resources: Arc::new(Mutex::new(Resources {
                    backend: Some(backend),
                    connection: None,
                    capture_task: None,
                })),
                active: Arc::new(AtomicBool::new(false)),
                frames_sent: Arc::new(AtomicUsize::new(0)),
            },
            event_task: Arc::new(Mutex::new(None)),
            started_at: Utc::now(),
        }
    }

    /// Start the session: acquire the microphone and the output device,
    /// then open the remote connection. Capture begins only once the
    /// remote session reports open.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.shared.state.lock().await;
            if *state != SessionState::Idle {
                anyhow::bail!("Session already started");
            }
            *state = SessionState::Connecting;
        }

        info!("Starting tutor session: {}", self.config.session_id);

        // Local audio comes first: a denied microphone must fail the
        // session without any remote connection attempt
        let mut backend = {
            self.shared
                .resources
                .lock()
                .await
                .backend
                .take()
                .context("Capture backend already consumed")?
        };

        let frames_rx = match backend.start().await {
            Ok(rx) => {
                self.shared.resources.lock().await.backend = Some(backend);
                rx
            }
            Err(e) => {
                self.shared.resources.lock().await.backend = Some(backend);
                let message = format!("Microphone unavailable: {}", e);
                self.shared.fail(message.clone()).await;
                self.shared.release_resources().await;
                anyhow::bail!(message);
            }
        };

        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        if let Err(e) = self.shared.scheduler.lock().await.open(finished_tx) {
            let message = format!("Audio output unavailable: {}", e);
            self.shared.fail(message.clone()).await;
            self.shared.release_resources().await;
            anyhow::bail!(message);
        }

        let setup = LiveSetup {
            model: self.config.model.clone(),
            system_instruction: self.config.system_instruction.clone(),
        };

        let (connection, events_rx) = match self.live.connect(setup).await {
            Ok(pair) => pair,
            Err(e) => {
                let message = format!("Connection failed: {}", e);
                self.shared.fail(message.clone()).await;
                self.shared.release_resources().await;
                anyhow::bail!(message);
            }
        };

        self.shared.resources.lock().await.connection = Some(connection);
        self.shared.active.store(true, Ordering::SeqCst);

        let shared = self.shared.clone();
        let output_sample_rate = self.config.output_sample_rate;
        let handle = tokio::spawn(async move {
            run_event_loop(shared, events_rx, finished_rx, frames_rx, output_sample_rate).await;
        });

        *self.event_task.lock().await = Some(handle);

        info!("Session {} connecting", self.config.session_id);

        Ok(())
    }

    /// User-initiated stop. Runs the shared cleanup routine regardless of
    /// current state; calling it repeatedly, or without a prior start, is
    /// harmless.
    pub async fn stop(&self) -> Result<SessionStats> {
        info!("Stopping tutor session: {}", self.config.session_id);

        self.shared.release_resources().await;

        {
            let mut state = self.shared.state.lock().await;
            if *state != SessionState::Idle {
                *state = SessionState::Closed;
            }
        }

        if let Some(task) = self.event_task.lock().await.take() {
            task.abort();
            let _ = task.await;
        }

        Ok(self.stats().await)
    }

    pub async fn state(&self) -> SessionState {
        *self.shared.state.lock().await
    }

    /// Whether the session currently holds the microphone and connection
    pub async fn is_active(&self) -> bool {
        matches!(
            self.state().await,
            SessionState::Connecting | SessionState::Open
        )
    }

    /// Accumulated transcript turns
    pub async fn transcript(&self) -> Vec<TranscriptTurn> {
        self.shared.transcript.lock().await.turns().to_vec()
    }

    /// Current session statistics
    pub async fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            session_id: self.config.session_id.clone(),
            state: self.state().await,
            error: self.shared.error.lock().await.clone(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_sent: self.shared.frames_sent.load(Ordering::SeqCst),
            transcript_turns: self.shared.transcript.lock().await.len(),
            active_segments: self.shared.scheduler.lock().await.active_segments(),
        }
    }
}

/// Route inbound events until the session closes or errors.
///
/// All state mutation happens here, on delivery of discrete events, in
/// delivery order.
async fn run_event_loop(
    shared: Shared,
    mut events: mpsc::Receiver<LiveEvent>,
    mut finished: mpsc::UnboundedReceiver<SegmentId>,
    frames_rx: mpsc::Receiver<AudioFrame>,
    output_sample_rate: u32,
) {
    let mut frames_rx = Some(frames_rx);
    let mut sink_alive = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(LiveEvent::Opened) => {
                    info!("Live session open");
                    shared.set_state(SessionState::Open).await;

                    if let Some(frames) = frames_rx.take() {
                        let capture = spawn_capture(shared.clone(), frames);
                        shared.resources.lock().await.capture_task = Some(capture);
                    }
                }
                Some(LiveEvent::Transcript { speaker, text }) => {
                    shared.transcript.lock().await.append(speaker, &text);
                }
                Some(LiveEvent::Audio(pcm)) => {
                    let segment = codec::segment_from_pcm16(&pcm, output_sample_rate);
                    if let Err(e) = shared.scheduler.lock().await.enqueue(segment) {
                        warn!("Failed to schedule assistant speech: {}", e);
                    }
                }
                Some(LiveEvent::Interrupted) => {
                    shared.scheduler.lock().await.interrupt();
                }
                Some(LiveEvent::Error(message)) => {
                    shared.release_resources().await;
                    shared.fail(format!("Connection error: {}", message)).await;
                    break;
                }
                Some(LiveEvent::Closed) | None => {
                    info!("Live session closed by remote");
                    shared.release_resources().await;
                    if *shared.state.lock().await != SessionState::Errored {
                        shared.set_state(SessionState::Closed).await;
                    }
                    break;
                }
            },
            id = finished.recv(), if sink_alive => match id {
                Some(id) => shared.scheduler.lock().await.segment_finished(id),
                None => sink_alive = false,
            },
        }
    }
}

/// Forward captured frames to the live connection until cleanup
/// disconnects the pipeline
fn spawn_capture(shared: Shared, mut frames_rx: mpsc::Receiver<AudioFrame>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Capture pipeline started");

        while let Some(frame) = frames_rx.recv().await {
            if !shared.active.load(Ordering::SeqCst) {
                break;
            }

            {
                let mut resources = shared.resources.lock().await;
                let Some(connection) = resources.connection.as_mut() else {
                    break;
                };

                // Real-time stream: a failed frame is dropped, not retried
                if let Err(e) = connection.send_audio(&frame.samples).await {
                    warn!("Failed to send audio frame: {}", e);
                    continue;
                }
            }

            shared.frames_sent.fetch_add(1, Ordering::SeqCst);
        }

        info!("Capture pipeline stopped");
    })
}
