// Integration tests for the session controller state machine
//
// The live API, the capture backend, and the playback sink are replaced
// with in-memory doubles so the full lifecycle can be driven event by
// event: connect, open, transcript/audio routing, interruption, remote
// close/error, and idempotent cleanup.

use anyhow::Result;
use lingua_live::audio::playback::{PlaybackSink, SegmentId};
use lingua_live::audio::{AudioBackend, AudioFrame, AudioSegment};
use lingua_live::live::{LiveApi, LiveConnection, LiveEvent, LiveSetup};
use lingua_live::session::{SessionConfig, SessionState, TutorSession};
use lingua_live::transcript::Speaker;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Clone)]
struct MockBackend {
    fail_start: bool,
    started: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    frames_tx: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
}

impl MockBackend {
    fn new(fail_start: bool) -> Self {
        Self {
            fail_start,
            started: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
            frames_tx: Arc::new(Mutex::new(None)),
        }
    }

    async fn feed(&self, frame: AudioFrame) {
        let tx = self
            .frames_tx
            .lock()
            .await
            .clone()
            .expect("backend started");
        tx.send(frame).await.expect("frame delivered");
    }
}

#[async_trait::async_trait]
impl AudioBackend for MockBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.fail_start {
            anyhow::bail!("permission denied");
        }
        let (tx, rx) = mpsc::channel(32);
        *self.frames_tx.lock().await = Some(tx);
        self.started.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        self.frames_tx.lock().await.take();
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.stopped.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "mock-microphone"
    }
}

#[derive(Clone, Default)]
struct MockLive {
    fail_connect: bool,
    connects: Arc<AtomicUsize>,
    frames_received: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    events_tx: Arc<Mutex<Option<mpsc::Sender<LiveEvent>>>>,
}

impl MockLive {
    async fn emit(&self, event: LiveEvent) {
        let tx = self.events_tx.lock().await.clone().expect("connected");
        tx.send(event).await.expect("event delivered");
    }
}

#[async_trait::async_trait]
impl LiveApi for MockLive {
    async fn connect(
        &self,
        _setup: LiveSetup,
    ) -> Result<(Box<dyn LiveConnection>, mpsc::Receiver<LiveEvent>)> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            anyhow::bail!("refused");
        }

        let (tx, rx) = mpsc::channel(64);
        *self.events_tx.lock().await = Some(tx);

        Ok((
            Box::new(MockConnection {
                frames_received: Arc::clone(&self.frames_received),
                closed: Arc::clone(&self.closed),
            }),
            rx,
        ))
    }
}

struct MockConnection {
    frames_received: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl LiveConnection for MockConnection {
    async fn send_audio(&mut self, _samples: &[i16]) -> Result<()> {
        self.frames_received.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct MockSinkState {
    now: f64,
    plays: Vec<(SegmentId, f64, f64)>,
    stopped: Vec<SegmentId>,
}

#[derive(Clone, Default)]
struct MockSink {
    state: Arc<parking_lot::Mutex<MockSinkState>>,
}

impl MockSink {
    fn set_now(&self, now: f64) {
        self.state.lock().now = now;
    }

    fn plays(&self) -> Vec<(SegmentId, f64, f64)> {
        self.state.lock().plays.clone()
    }

    fn stopped(&self) -> Vec<SegmentId> {
        self.state.lock().stopped.clone()
    }
}

impl PlaybackSink for MockSink {
    fn open(&mut self, _finished: mpsc::UnboundedSender<SegmentId>) -> Result<()> {
        Ok(())
    }

    fn play(&mut self, id: SegmentId, segment: AudioSegment, start_at: f64) -> Result<()> {
        self.state
            .lock()
            .plays
            .push((id, start_at, segment.duration_secs()));
        Ok(())
    }

    fn stop(&mut self, id: SegmentId) {
        self.state.lock().stopped.push(id);
    }

    fn now(&self) -> f64 {
        self.state.lock().now
    }

    fn close(&mut self) {}
}

// ============================================================================
// Helpers
// ============================================================================

fn harness(fail_mic: bool) -> (Arc<TutorSession>, MockLive, MockBackend, MockSink) {
    let live = MockLive::default();
    let backend = MockBackend::new(fail_mic);
    let sink = MockSink::default();

    let session = Arc::new(TutorSession::new(
        SessionConfig::default(),
        Arc::new(live.clone()),
        Box::new(backend.clone()),
        Box::new(sink.clone()),
    ));

    (session, live, backend, sink)
}

async fn eventually<F, Fut>(mut check: F, what: &str)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..400 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {}", what);
}

fn frame() -> AudioFrame {
    AudioFrame {
        samples: vec![0i16; 4096],
        sample_rate: 16_000,
        timestamp_ms: 0,
    }
}

/// Raw PCM bytes for `secs` of silence at 24kHz
fn pcm(secs: f64) -> Vec<u8> {
    vec![0u8; (secs * 24_000.0) as usize * 2]
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_mic_denied_blocks_remote_connection() {
    let (session, live, backend, _sink) = harness(true);

    let err = session.start().await.expect_err("start must fail");
    assert!(err.to_string().contains("Microphone unavailable"));

    assert_eq!(session.state().await, SessionState::Errored);
    assert_eq!(live.connects.load(Ordering::SeqCst), 0);
    assert!(!backend.started.load(Ordering::SeqCst));

    let stats = session.stats().await;
    assert!(stats.error.is_some());
}

#[tokio::test]
async fn test_cleanup_idempotent_without_start() {
    let (session, _live, _backend, _sink) = harness(false);

    session.stop().await.expect("first stop");
    session.stop().await.expect("second stop");

    assert_eq!(session.state().await, SessionState::Idle);
}

#[tokio::test]
async fn test_stop_releases_resources_and_is_idempotent() {
    let (session, live, backend, _sink) = harness(false);

    session.start().await.expect("start");
    live.emit(LiveEvent::Opened).await;
    eventually(
        || async { session.state().await == SessionState::Open },
        "open state",
    )
    .await;

    session.stop().await.expect("first stop");
    let stats = session.stop().await.expect("second stop");

    assert_eq!(stats.state, SessionState::Closed);
    assert!(backend.stopped.load(Ordering::SeqCst));
    assert!(live.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_double_start_rejected() {
    let (session, live, _backend, _sink) = harness(false);

    session.start().await.expect("start");
    let err = session.start().await.expect_err("second start must fail");
    assert!(err.to_string().contains("already started"));

    // Only one connection was ever attempted
    assert_eq!(live.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_assistant_fragments_form_single_turn() {
    let (session, live, _backend, _sink) = harness(false);

    session.start().await.expect("start");
    live.emit(LiveEvent::Opened).await;

    for text in ["Guten ", "Tag, wie ", "geht's?"] {
        live.emit(LiveEvent::Transcript {
            speaker: Speaker::Assistant,
            text: text.to_string(),
        })
        .await;
    }

    eventually(
        || async {
            let turns = session.transcript().await;
            turns.len() == 1 && turns[0].text == "Guten Tag, wie geht's?"
        },
        "merged transcript turn",
    )
    .await;

    session.stop().await.expect("stop");
}

#[tokio::test]
async fn test_transcript_attributes_speakers() {
    let (session, live, _backend, _sink) = harness(false);

    session.start().await.expect("start");
    live.emit(LiveEvent::Opened).await;

    live.emit(LiveEvent::Transcript {
        speaker: Speaker::User,
        text: "Hallo".to_string(),
    })
    .await;
    live.emit(LiveEvent::Transcript {
        speaker: Speaker::Assistant,
        text: "Hallo! ".to_string(),
    })
    .await;
    live.emit(LiveEvent::Transcript {
        speaker: Speaker::Assistant,
        text: "Wie geht's?".to_string(),
    })
    .await;

    eventually(
        || async {
            let turns = session.transcript().await;
            turns.len() == 2
                && turns[0].speaker == Speaker::User
                && turns[1].text == "Hallo! Wie geht's?"
        },
        "two attributed turns",
    )
    .await;

    session.stop().await.expect("stop");
}

#[tokio::test]
async fn test_interrupt_stops_active_segments() {
    let (session, live, _backend, sink) = harness(false);

    session.start().await.expect("start");
    live.emit(LiveEvent::Opened).await;

    live.emit(LiveEvent::Audio(pcm(0.2))).await;
    live.emit(LiveEvent::Audio(pcm(0.3))).await;

    eventually(
        || async { session.stats().await.active_segments == 2 },
        "two active segments",
    )
    .await;

    live.emit(LiveEvent::Interrupted).await;

    eventually(
        || async { session.stats().await.active_segments == 0 },
        "empty active set",
    )
    .await;
    assert_eq!(sink.stopped().len(), 2);

    // The timeline restarted: a segment enqueued after the interruption
    // starts at the current time, not at the old marker
    sink.set_now(3.0);
    live.emit(LiveEvent::Audio(pcm(0.1))).await;

    eventually(|| async { sink.plays().len() == 3 }, "third segment").await;
    let plays = sink.plays();
    assert_eq!(plays[2].1, 3.0);

    session.stop().await.expect("stop");
}

#[tokio::test]
async fn test_remote_close_transitions_to_closed() {
    let (session, live, backend, _sink) = harness(false);

    session.start().await.expect("start");
    live.emit(LiveEvent::Opened).await;
    live.emit(LiveEvent::Closed).await;

    eventually(
        || async { session.state().await == SessionState::Closed },
        "closed state",
    )
    .await;
    assert!(backend.stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_remote_error_surfaces_message_and_cleans_up() {
    let (session, live, backend, _sink) = harness(false);

    session.start().await.expect("start");
    live.emit(LiveEvent::Opened).await;
    live.emit(LiveEvent::Error("socket reset".to_string())).await;

    eventually(
        || async { session.state().await == SessionState::Errored },
        "errored state",
    )
    .await;

    let stats = session.stats().await;
    assert!(stats.error.expect("message").contains("socket reset"));
    assert!(backend.stopped.load(Ordering::SeqCst));
    assert!(live.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_connect_failure_releases_audio() {
    let live = MockLive {
        fail_connect: true,
        ..MockLive::default()
    };
    let backend = MockBackend::new(false);
    let session = TutorSession::new(
        SessionConfig::default(),
        Arc::new(live.clone()),
        Box::new(backend.clone()),
        Box::new(MockSink::default()),
    );

    let err = session.start().await.expect_err("connect must fail");
    assert!(err.to_string().contains("Connection failed"));

    assert_eq!(session.state().await, SessionState::Errored);
    // The microphone acquired before the attempt was released again
    assert!(backend.stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_frames_forwarded_after_open() {
    let (session, live, backend, _sink) = harness(false);

    session.start().await.expect("start");
    live.emit(LiveEvent::Opened).await;
    eventually(
        || async { session.state().await == SessionState::Open },
        "open state",
    )
    .await;

    for _ in 0..3 {
        backend.feed(frame()).await;
    }

    eventually(
        || async { live.frames_received.load(Ordering::SeqCst) >= 3 },
        "frames forwarded",
    )
    .await;
    eventually(
        || async { session.stats().await.frames_sent >= 3 },
        "frames counted",
    )
    .await;

    session.stop().await.expect("stop");
}
