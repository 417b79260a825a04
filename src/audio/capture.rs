//! Microphone capture pipeline.
//!
//! The `AudioBackend` trait hands fixed-size frames of 16-bit PCM to the
//! session over a bounded channel. Delivery is lossy: if the session falls
//! behind, frames are dropped rather than delayed, since late audio is
//! worse than missing audio on a live connection.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::codec;

/// One fixed-size frame of captured microphone audio (16-bit PCM, mono)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for the capture backend
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate delivered to the session (the wire expects 16kHz)
    pub sample_rate: u32,
    /// Samples per delivered frame (4096 @ 16kHz is roughly 256ms)
    pub frame_samples: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: codec::INPUT_SAMPLE_RATE,
            frame_samples: 4096,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - `MicrophoneBackend`: cpal default input device (all platforms)
/// - Test doubles that feed scripted frames
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames.
    /// Failure here (no device, permission denied) must be surfaced to the
    /// caller, not retried.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio and release the device
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Accumulates device callback buffers of arbitrary length and emits
/// fixed-size frames
pub struct FrameChunker {
    frame_samples: usize,
    pending: Vec<i16>,
}

impl FrameChunker {
    pub fn new(frame_samples: usize) -> Self {
        Self {
            frame_samples,
            pending: Vec::with_capacity(frame_samples),
        }
    }

    /// Push new samples and drain every complete frame they produce
    pub fn push(&mut self, samples: &[i16]) -> Vec<Vec<i16>> {
        self.pending.extend_from_slice(samples);

        let mut frames = Vec::new();
        while self.pending.len() >= self.frame_samples {
            let rest = self.pending.split_off(self.frame_samples);
            frames.push(std::mem::replace(&mut self.pending, rest));
        }

        frames
    }

    /// Samples buffered but not yet emitted
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Microphone backend using the default cpal input device.
///
/// The cpal stream is not `Send`, so it lives on a dedicated thread that is
/// parked until `stop` signals it to release the device.
pub struct MicrophoneBackend {
    config: CaptureConfig,
    capturing: bool,
    shutdown: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            capturing: false,
            shutdown: None,
            thread: None,
        }
    }

    fn build_stream(
        config: &CaptureConfig,
        frames_tx: mpsc::Sender<AudioFrame>,
    ) -> Result<cpal::Stream> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No microphone available"))?;

        info!("Microphone device: {}", device.name().unwrap_or_default());

        // Prefer a device rate that decimates cleanly to the target rate
        let target = config.sample_rate;
        let candidate_rates = [target, target * 2, target * 3];
        let mut selected = None;

        for &rate in &candidate_rates {
            let ranges = device
                .supported_input_configs()
                .context("Failed to query microphone configurations")?;
            for range in ranges {
                if range.min_sample_rate().0 <= rate && range.max_sample_rate().0 >= rate {
                    selected = Some(range.with_sample_rate(cpal::SampleRate(rate)));
                    break;
                }
            }
            if selected.is_some() {
                break;
            }
        }

        let stream_config = selected.ok_or_else(|| {
            anyhow!(
                "Microphone does not support {}Hz or an integer multiple of it",
                target
            )
        })?;

        let device_rate = stream_config.sample_rate().0;
        let channels = stream_config.channels() as usize;
        let decimation = (device_rate / target) as usize;

        info!(
            "Capture config: {}Hz, {} channels, decimation {}",
            device_rate, channels, decimation
        );

        let mut chunker = FrameChunker::new(config.frame_samples);
        let mut samples_sent: u64 = 0;
        let frame_samples = config.frame_samples;

        let err_fn = |err| error!("Microphone stream error: {}", err);

        let stream = device
            .build_input_stream(
                &stream_config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Mix to mono, decimate to the target rate, quantize
                    let mono: Vec<i16> = data
                        .chunks_exact(channels)
                        .step_by(decimation)
                        .map(|frame| {
                            let sum: f32 = frame.iter().sum();
                            codec::f32_to_i16(sum / channels as f32)
                        })
                        .collect();

                    for frame in chunker.push(&mono) {
                        let timestamp_ms = samples_sent * 1000 / target as u64;
                        samples_sent += frame_samples as u64;

                        // Lossy on backpressure: never block the device callback
                        if frames_tx
                            .try_send(AudioFrame {
                                samples: frame,
                                sample_rate: target,
                                timestamp_ms,
                            })
                            .is_err()
                        {
                            warn!("Capture channel full, dropping frame");
                        }
                    }
                },
                err_fn,
                None,
            )
            .context("Failed to open microphone stream")?;

        stream.play().context("Failed to start microphone stream")?;

        Ok(stream)
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            anyhow::bail!("Already capturing");
        }

        let (frames_tx, frames_rx) = mpsc::channel(32);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();

        let config = self.config.clone();

        let thread = std::thread::spawn(move || {
            let stream = match Self::build_stream(&config, frames_tx) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            // Hold the stream until stop() drops its end of the channel
            let _ = shutdown_rx.recv();
            drop(stream);
            info!("Microphone released");
        });

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => anyhow::bail!("Capture thread exited before reporting readiness"),
        }

        self.shutdown = Some(shutdown_tx);
        self.thread = Some(thread);
        self.capturing = true;

        info!("Microphone capture started");

        Ok(frames_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }

        self.capturing = false;
        self.shutdown.take();

        if let Some(thread) = self.thread.take() {
            let joined = tokio::task::spawn_blocking(move || thread.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                warn!("Capture thread did not shut down cleanly");
            }
        }

        info!("Microphone capture stopped");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}
