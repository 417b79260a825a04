//! Gapless playback scheduling for assistant speech.
//!
//! Segments arrive asynchronously and at irregular intervals; the scheduler
//! chains each one to start at `max(now, end of last scheduled segment)` so
//! playback is sequential with no gaps and no overlap. An interruption stops
//! everything that is scheduled and resets the timeline to a fresh zero
//! baseline so the next segment starts immediately.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::codec::AudioSegment;

/// Handle for one scheduled segment. Monotonically assigned per scheduler,
/// never reused within a session.
pub type SegmentId = u64;

/// Output device abstraction driven by the scheduler.
///
/// The sink owns the playback clock: `now()` advances as samples are
/// rendered. When a segment's samples are exhausted the sink reports its id
/// on the completion channel handed to `open`.
pub trait PlaybackSink: Send {
    /// Open the output device and register the completion channel
    fn open(&mut self, finished: mpsc::UnboundedSender<SegmentId>) -> Result<()>;

    /// Begin playing `segment` at `start_at` seconds on the sink clock
    fn play(&mut self, id: SegmentId, segment: AudioSegment, start_at: f64) -> Result<()>;

    /// Stop a scheduled or playing segment; unknown ids are a no-op
    fn stop(&mut self, id: SegmentId);

    /// Current position of the sink clock in seconds
    fn now(&self) -> f64;

    /// Release the output device; safe to call repeatedly
    fn close(&mut self);
}

/// Queues decoded segments for sequential playback and supports immediate
/// full-stop.
pub struct PlaybackScheduler {
    sink: Box<dyn PlaybackSink>,
    /// End time of the last scheduled segment on the sink clock
    next_start: f64,
    /// Currently scheduled (not yet finished) segments and their end times
    active: HashMap<SegmentId, f64>,
    next_id: SegmentId,
}

impl PlaybackScheduler {
    pub fn new(sink: Box<dyn PlaybackSink>) -> Self {
        Self {
            sink,
            next_start: 0.0,
            active: HashMap::new(),
            next_id: 0,
        }
    }

    /// Open the underlying output device
    pub fn open(&mut self, finished: mpsc::UnboundedSender<SegmentId>) -> Result<()> {
        self.sink.open(finished)
    }

    /// Schedule a segment to start at the later of "now" and the end of the
    /// last scheduled segment
    pub fn enqueue(&mut self, segment: AudioSegment) -> Result<SegmentId> {
        let now = self.sink.now();
        // A marker in the past (e.g. after a long silence) must not delay
        // the new segment
        let start_at = self.next_start.max(now);
        let end_at = start_at + segment.duration_secs();

        let id = self.next_id;
        self.next_id += 1;

        self.sink
            .play(id, segment, start_at)
            .context("Failed to schedule playback segment")?;

        self.active.insert(id, end_at);
        self.next_start = end_at;

        Ok(id)
    }

    /// Stop every scheduled segment, clear the active set, and reset the
    /// timeline to a fresh zero baseline
    pub fn interrupt(&mut self) {
        let stopped = self.active.len();
        for id in self.active.keys().copied().collect::<Vec<_>>() {
            self.sink.stop(id);
        }
        self.active.clear();
        self.next_start = 0.0;

        if stopped > 0 {
            info!("Playback interrupted, {} segment(s) stopped", stopped);
        }
    }

    /// Record that a segment finished playing naturally
    pub fn segment_finished(&mut self, id: SegmentId) {
        self.active.remove(&id);
    }

    /// Number of segments scheduled but not yet finished
    pub fn active_segments(&self) -> usize {
        self.active.len()
    }

    /// End time of the last scheduled segment (the chaining marker)
    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    /// Stop everything and release the output device
    pub fn close(&mut self) {
        self.interrupt();
        self.sink.close();
    }
}

/// One segment placed on the speaker timeline
struct Placed {
    id: SegmentId,
    start_frame: u64,
    samples: Vec<f32>,
}

#[derive(Default)]
struct SpeakerShared {
    /// Frames rendered since the device opened; the playback clock
    cursor: u64,
    placed: Vec<Placed>,
    finished: Option<mpsc::UnboundedSender<SegmentId>>,
}

/// Speaker sink using the default cpal output device.
///
/// Scheduled segments are mixed by the output callback against a
/// sample-count clock, so `now()` tracks rendered audio rather than wall
/// time. The cpal stream is not `Send` and lives on a dedicated thread.
pub struct SpeakerSink {
    sample_rate: u32,
    shared: Arc<Mutex<SpeakerShared>>,
    shutdown: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SpeakerSink {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            shared: Arc::new(Mutex::new(SpeakerShared::default())),
            shutdown: None,
            thread: None,
        }
    }

    fn build_stream(
        sample_rate: u32,
        shared: Arc<Mutex<SpeakerShared>>,
    ) -> Result<cpal::Stream> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No audio output device available"))?;

        info!("Speaker device: {}", device.name().unwrap_or_default());

        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_fn = |err| error!("Speaker stream error: {}", err);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut state = shared.lock();
                    let cursor = state.cursor;

                    for (i, out) in data.iter_mut().enumerate() {
                        let t = cursor + i as u64;
                        let mut acc = 0.0f32;
                        for seg in &state.placed {
                            if t >= seg.start_frame {
                                let offset = (t - seg.start_frame) as usize;
                                if offset < seg.samples.len() {
                                    acc += seg.samples[offset];
                                }
                            }
                        }
                        *out = acc.clamp(-1.0, 1.0);
                    }

                    state.cursor = cursor + data.len() as u64;

                    // Report segments whose samples are fully rendered
                    let now = state.cursor;
                    let mut done = Vec::new();
                    state.placed.retain(|seg| {
                        if seg.start_frame + seg.samples.len() as u64 <= now {
                            done.push(seg.id);
                            false
                        } else {
                            true
                        }
                    });
                    if let Some(tx) = &state.finished {
                        for id in done {
                            let _ = tx.send(id);
                        }
                    }
                },
                err_fn,
                None,
            )
            .context("Failed to open speaker stream")?;

        stream.play().context("Failed to start speaker stream")?;

        Ok(stream)
    }
}

impl PlaybackSink for SpeakerSink {
    fn open(&mut self, finished: mpsc::UnboundedSender<SegmentId>) -> Result<()> {
        if self.thread.is_some() {
            anyhow::bail!("Speaker already open");
        }

        self.shared.lock().finished = Some(finished);

        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<()>>();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();
        let sample_rate = self.sample_rate;
        let shared = Arc::clone(&self.shared);

        let thread = std::thread::spawn(move || {
            let stream = match Self::build_stream(sample_rate, shared) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            let _ = shutdown_rx.recv();
            drop(stream);
            info!("Speaker released");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => anyhow::bail!("Speaker thread exited before reporting readiness"),
        }

        self.shutdown = Some(shutdown_tx);
        self.thread = Some(thread);

        info!("Speaker opened at {}Hz", self.sample_rate);

        Ok(())
    }

    fn play(&mut self, id: SegmentId, segment: AudioSegment, start_at: f64) -> Result<()> {
        if self.thread.is_none() {
            anyhow::bail!("Speaker is not open");
        }
        if segment.sample_rate != self.sample_rate {
            warn!(
                "Segment rate {}Hz differs from sink rate {}Hz",
                segment.sample_rate, self.sample_rate
            );
        }

        let start_frame = (start_at * self.sample_rate as f64) as u64;
        self.shared.lock().placed.push(Placed {
            id,
            start_frame,
            samples: segment.samples,
        });

        Ok(())
    }

    fn stop(&mut self, id: SegmentId) {
        self.shared.lock().placed.retain(|seg| seg.id != id);
    }

    fn now(&self) -> f64 {
        self.shared.lock().cursor as f64 / self.sample_rate as f64
    }

    fn close(&mut self) {
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Speaker thread did not shut down cleanly");
            }
        }

        let mut state = self.shared.lock();
        state.placed.clear();
        state.finished = None;
    }
}
