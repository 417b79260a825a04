// Unit tests for the playback scheduler
//
// Segments must chain gaplessly: each starts at the later of "now" and the
// end of the previously scheduled segment. Interruption stops everything
// and resets the timeline to a fresh zero baseline.

use anyhow::Result;
use lingua_live::audio::playback::{PlaybackScheduler, PlaybackSink, SegmentId};
use lingua_live::audio::AudioSegment;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Default)]
struct MockSinkState {
    now: f64,
    open: bool,
    /// (id, start_at, duration)
    plays: Vec<(SegmentId, f64, f64)>,
    stopped: Vec<SegmentId>,
}

#[derive(Clone, Default)]
struct MockSink {
    state: Arc<Mutex<MockSinkState>>,
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
        self.state.lock().open = true;
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

    fn close(&mut self) {
        self.state.lock().open = false;
    }
}

fn segment(duration_secs: f64) -> AudioSegment {
    let sample_rate = 24_000u32;
    AudioSegment {
        samples: vec![0.0; (duration_secs * sample_rate as f64).round() as usize],
        sample_rate,
    }
}

fn scheduler() -> (PlaybackScheduler, MockSink) {
    let sink = MockSink::default();
    let mut scheduler = PlaybackScheduler::new(Box::new(sink.clone()));
    let (tx, _rx) = mpsc::unbounded_channel();
    scheduler.open(tx).expect("mock sink opens");
    (scheduler, sink)
}

#[test]
fn test_segments_chain_back_to_back() -> Result<()> {
    let (mut scheduler, sink) = scheduler();

    scheduler.enqueue(segment(1.0))?;
    scheduler.enqueue(segment(0.5))?;
    scheduler.enqueue(segment(0.25))?;

    let plays = sink.plays();
    assert_eq!(plays[0].1, 0.0);
    assert_eq!(plays[1].1, 1.0);
    assert_eq!(plays[2].1, 1.5);
    assert_eq!(scheduler.next_start(), 1.75);
    assert_eq!(scheduler.active_segments(), 3);

    Ok(())
}

#[test]
fn test_stale_marker_does_not_delay_new_segment() -> Result<()> {
    // After a long silence the chaining marker is in the past; the next
    // segment must start now, not at the stale marker
    let (mut scheduler, sink) = scheduler();

    scheduler.enqueue(segment(1.0))?;
    sink.set_now(4.0);
    scheduler.enqueue(segment(0.5))?;

    let plays = sink.plays();
    assert_eq!(plays[1].1, 4.0);
    assert_eq!(scheduler.next_start(), 4.5);

    Ok(())
}

#[test]
fn test_start_time_is_max_of_arrival_and_previous_end() -> Result<()> {
    // Property: segment i starts at max(t_i, end of segment i-1)
    let durations = [0.4, 0.4, 0.1, 0.3];
    let arrivals = [0.0, 0.1, 1.5, 1.6];

    let (mut scheduler, sink) = scheduler();

    let mut expected_end = 0.0f64;
    for (d, t) in durations.iter().zip(arrivals.iter()) {
        sink.set_now(*t);
        scheduler.enqueue(segment(*d))?;

        let (_, start, duration) = *sink.plays().last().expect("segment scheduled");
        assert_eq!(start, t.max(expected_end));
        expected_end = start + duration;
    }

    // No overlap: each start >= previous end
    let plays = sink.plays();
    for pair in plays.windows(2) {
        assert!(pair[1].1 >= pair[0].1 + pair[0].2 - 1e-9);
    }

    Ok(())
}

#[test]
fn test_interrupt_stops_everything_and_resets_marker() -> Result<()> {
    let (mut scheduler, sink) = scheduler();

    let a = scheduler.enqueue(segment(1.0))?;
    let b = scheduler.enqueue(segment(1.0))?;
    assert_eq!(scheduler.active_segments(), 2);

    scheduler.interrupt();

    let stopped = sink.stopped();
    assert!(stopped.contains(&a));
    assert!(stopped.contains(&b));
    assert_eq!(scheduler.active_segments(), 0);
    assert_eq!(scheduler.next_start(), 0.0);

    Ok(())
}

#[test]
fn test_segment_after_interrupt_starts_immediately() -> Result<()> {
    let (mut scheduler, sink) = scheduler();

    scheduler.enqueue(segment(10.0))?;
    sink.set_now(2.0);
    scheduler.interrupt();

    scheduler.enqueue(segment(1.0))?;

    // Starts at the current time, not at the pre-interruption marker (10.0)
    let plays = sink.plays();
    assert_eq!(plays[1].1, 2.0);

    Ok(())
}

#[test]
fn test_natural_completion_shrinks_active_set() -> Result<()> {
    let (mut scheduler, _sink) = scheduler();

    let a = scheduler.enqueue(segment(0.5))?;
    let b = scheduler.enqueue(segment(0.5))?;

    scheduler.segment_finished(a);
    assert_eq!(scheduler.active_segments(), 1);

    // Finishing an unknown or already-finished id is a no-op
    scheduler.segment_finished(a);
    assert_eq!(scheduler.active_segments(), 1);

    scheduler.segment_finished(b);
    assert_eq!(scheduler.active_segments(), 0);

    // The marker is untouched by natural completion
    assert_eq!(scheduler.next_start(), 1.0);

    Ok(())
}
