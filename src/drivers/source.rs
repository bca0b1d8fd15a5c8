use std::collections::VecDeque;
use std::f64::consts::PI;
use rand::Rng;
use crate::clock::local_clock;
use crate::drivers::StreamError;
/// Result of a single non-blocking poll: zero or more samples with one timestamp each.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Chunk {
    pub samples: Vec<Vec<f64>>, // samples x channels
    pub timestamps: Vec<f64>,
}
impl Chunk {
    pub fn new(samples: Vec<Vec<f64>>, timestamps: Vec<f64>) -> Self {
        Self {
            samples,
            timestamps,
        }
    }
    pub fn empty() -> Self {
        Self::default()
    }
    /// A poll with nothing to report. Ends a drain cycle.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.timestamps.is_empty()
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    /// Checks the sample/timestamp pairing and the width of every sample.
    pub fn validate(&self, channel_count: usize) -> Result<(), StreamError> {
        if self.samples.len() != self.timestamps.len() {
            return Err(StreamError::MalformedChunk {
                samples: self.samples.len(),
                timestamps: self.timestamps.len(),
            });
        }
        if let Some(bad) = self.samples.iter().find(|s| s.len() != channel_count) {
            return Err(StreamError::ChannelMismatch {
                expected: channel_count,
                actual: bad.len(),
            });
        }
        Ok(())
    }
}
/// Something that hands out newly arrived samples on demand without blocking.
pub trait ChunkSource {
    /// Returns everything the source chooses to release right now; an empty
    /// chunk when nothing is available.
    fn poll_chunk(&mut self) -> Result<Chunk, StreamError>;
    /// Fixed for the lifetime of the connection.
    fn channel_count(&self) -> usize;
}
impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    fn poll_chunk(&mut self) -> Result<Chunk, StreamError> {
        (**self).poll_chunk()
    }
    fn channel_count(&self) -> usize {
        (**self).channel_count()
    }
}
/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    channel_count: usize,
    queue: VecDeque<Chunk>,
    fail_when_drained: bool,
}
impl ManualSource {
    pub fn new(channel_count: usize, chunks: impl IntoIterator<Item = Chunk>) -> Self {
        Self {
            channel_count,
            queue: chunks.into_iter().collect(),
            fail_when_drained: false,
        }
    }
    /// Report `ConnectionLost` instead of an empty chunk once the queue runs dry.
    pub fn fail_when_drained(mut self) -> Self {
        self.fail_when_drained = true;
        self
    }
    pub fn push(&mut self, chunk: Chunk) {
        self.queue.push_back(chunk);
    }
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}
impl ChunkSource for ManualSource {
    fn poll_chunk(&mut self) -> Result<Chunk, StreamError> {
        match self.queue.pop_front() {
            Some(chunk) => Ok(chunk),
            None if self.fail_when_drained => {
                Err(StreamError::ConnectionLost("playback queue exhausted".into()))
            }
            None => Ok(Chunk::empty()),
        }
    }
    fn channel_count(&self) -> usize {
        self.channel_count
    }
}
/// Synthetic sine generator that releases samples as wall-clock time passes.
///
/// Pending samples are handed out in chunks of at most `max_chunk`, so a
/// single drain typically needs several polls.
pub struct SimulatedSource {
    channel_count: usize,
    sample_rate_hz: f64,
    max_chunk: usize,
    noise: f64,
    started_at: f64,
    emitted: u64,
}
impl SimulatedSource {
    pub fn new(channel_count: usize, sample_rate_hz: f64) -> Self {
        Self {
            channel_count,
            sample_rate_hz,
            max_chunk: 32,
            noise: 0.05,
            started_at: local_clock(),
            emitted: 0,
        }
    }
    pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = max_chunk.max(1);
        self
    }
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.max(0.0);
        self
    }
    fn sample_at(&self, index: u64, rng: &mut impl Rng) -> Vec<f64> {
        let t = index as f64 / self.sample_rate_hz;
        (0..self.channel_count)
            .map(|ch| {
                let freq = 1.0 + ch as f64 * 0.5;
                let jitter = if self.noise > 0.0 {
                    rng.gen_range(-self.noise..self.noise)
                } else {
                    0.0
                };
                (2.0 * PI * freq * t).sin() + jitter
            })
            .collect()
    }
}
impl ChunkSource for SimulatedSource {
    fn poll_chunk(&mut self) -> Result<Chunk, StreamError> {
        let elapsed = local_clock() - self.started_at;
        let due = (elapsed * self.sample_rate_hz).floor() as u64;
        let pending = due.saturating_sub(self.emitted) as usize;
        let take = pending.min(self.max_chunk);
        if take == 0 {
            return Ok(Chunk::empty());
        }
        let mut rng = rand::thread_rng();
        let mut samples = Vec::with_capacity(take);
        let mut timestamps = Vec::with_capacity(take);
        for _ in 0..take {
            samples.push(self.sample_at(self.emitted, &mut rng));
            timestamps.push(self.started_at + self.emitted as f64 / self.sample_rate_hz);
            self.emitted += 1;
        }
        Ok(Chunk::new(samples, timestamps))
    }
    fn channel_count(&self) -> usize {
        self.channel_count
    }
}
