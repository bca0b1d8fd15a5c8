use std::thread;
use std::time::{Duration, Instant};
use log::{debug, info};
use crate::drivers::aggregator::SampleAggregator;
use crate::drivers::buffer::RingBuffer;
use crate::drivers::source::ChunkSource;
use crate::drivers::StreamError;
use crate::types::StopSignal;
/// Blocking initial fill of a [`RingBuffer`] before anyone may read it.
pub struct PrefillSequencer {
    timeout: Option<Duration>,
    poll_interval: Duration,
    stop: StopSignal,
}
impl PrefillSequencer {
    pub fn new(stop: StopSignal) -> Self {
        Self {
            timeout: None,
            poll_interval: Duration::from_millis(1),
            stop,
        }
    }
    /// Give up with `PrefillStalled` after this long. `None` waits until stopped.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
    /// Pause between empty drains. Zero busy-polls.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
    /// Drains and appends until at least `target_count` samples arrived since
    /// the call began. Returns the number of samples ingested.
    ///
    /// Samples that arrived ahead of a source error are appended before the
    /// error is returned.
    pub fn fill<S: ChunkSource>(
        &self,
        aggregator: &mut SampleAggregator<S>,
        buffer: &mut RingBuffer,
        target_count: usize,
    ) -> Result<usize, StreamError> {
        let started = Instant::now();
        let mut received = 0usize;
        while received < target_count {
            if self.stop.is_stopped() {
                return Err(StreamError::Cancelled);
            }
            let batch = aggregator.drain()?;
            if batch.is_empty() {
                let waited = started.elapsed();
                if self.timeout.is_some_and(|limit| waited >= limit) {
                    return Err(StreamError::PrefillStalled {
                        received,
                        target: target_count,
                        waited,
                    });
                }
                if !self.poll_interval.is_zero() {
                    thread::sleep(self.poll_interval);
                }
                continue;
            }
            received += buffer.append(&batch)?;
            debug!("prefill {received}/{target_count}");
        }
        info!(
            "prefill complete: {received} samples in {:.3}s",
            started.elapsed().as_secs_f64()
        );
        Ok(received)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::source::{Chunk, ManualSource};
    fn ramp(start: usize, len: usize) -> Chunk {
        Chunk::new(
            (start..start + len).map(|v| vec![v as f64]).collect(),
            (start..start + len).map(|v| v as f64 * 0.1).collect(),
        )
    }
    #[test]
    fn fill_stops_once_target_reached() {
        let source = ManualSource::new(
            1,
            vec![
                ramp(0, 2),
                Chunk::empty(),
                Chunk::empty(),
                ramp(2, 1),
                Chunk::empty(),
                ramp(3, 3),
                Chunk::empty(),
                ramp(6, 1),
            ],
        );
        let mut aggregator = SampleAggregator::new(source);
        let mut buffer = RingBuffer::new(5, 1, -1.0).unwrap();
        let sequencer = PrefillSequencer::new(StopSignal::new()).with_poll_interval(Duration::ZERO);
        let received = sequencer.fill(&mut aggregator, &mut buffer, 5).unwrap();
        assert_eq!(received, 6);
        assert!(buffer.is_primed());
        let snap = buffer.snapshot();
        assert_eq!(snap.flat_values(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(snap.timestamps().iter().all(|t| *t >= 0.0));
        assert_eq!(aggregator.source().remaining(), 1);
    }
    #[test]
    fn silent_source_reports_stall() {
        let mut aggregator = SampleAggregator::new(ManualSource::new(1, vec![ramp(0, 1)]));
        let mut buffer = RingBuffer::new(4, 1, 0.0).unwrap();
        let sequencer = PrefillSequencer::new(StopSignal::new())
            .with_timeout(Some(Duration::from_millis(20)));
        match sequencer.fill(&mut aggregator, &mut buffer, 4) {
            Err(StreamError::PrefillStalled {
                received, target, ..
            }) => {
                assert_eq!(received, 1);
                assert_eq!(target, 4);
            }
            other => panic!("expected stall, got {other:?}"),
        }
    }
    #[test]
    fn stop_signal_cancels_fill() {
        let stop = StopSignal::new();
        stop.stop();
        let mut aggregator = SampleAggregator::new(ManualSource::new(1, vec![]));
        let mut buffer = RingBuffer::new(4, 1, 0.0).unwrap();
        let result = PrefillSequencer::new(stop).fill(&mut aggregator, &mut buffer, 4);
        assert!(matches!(result, Err(StreamError::Cancelled)));
    }
    #[test]
    fn stop_from_another_thread_ends_unbounded_wait() {
        let stop = StopSignal::new();
        let remote = stop.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.stop();
        });
        let mut aggregator = SampleAggregator::new(ManualSource::new(1, vec![]));
        let mut buffer = RingBuffer::new(4, 1, 0.0).unwrap();
        let result = PrefillSequencer::new(stop)
            .with_timeout(None)
            .fill(&mut aggregator, &mut buffer, 4);
        stopper.join().unwrap();
        assert!(matches!(result, Err(StreamError::Cancelled)));
    }
    #[test]
    fn samples_before_loss_are_kept() {
        let source = ManualSource::new(1, vec![ramp(1, 2)]).fail_when_drained();
        let mut aggregator = SampleAggregator::new(source);
        let mut buffer = RingBuffer::new(4, 1, 0.0).unwrap();
        let sequencer = PrefillSequencer::new(StopSignal::new()).with_poll_interval(Duration::ZERO);
        let result = sequencer.fill(&mut aggregator, &mut buffer, 4);
        assert!(matches!(result, Err(StreamError::ConnectionLost(_))));
        assert_eq!(buffer.total_appended(), 2);
        assert_eq!(buffer.snapshot().flat_values(), vec![0.0, 0.0, 1.0, 2.0]);
    }
}
