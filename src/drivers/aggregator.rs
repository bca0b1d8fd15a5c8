use log::{debug, warn};
use crate::drivers::source::{Chunk, ChunkSource};
use crate::drivers::StreamError;
/// Samples gathered in one ingestion cycle, oldest first.
///
/// Only built from validated chunks, so `samples` and `timestamps` always have
/// the same length and every sample has `channel_count` values.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderedBatch {
    channel_count: usize,
    samples: Vec<Vec<f64>>,
    timestamps: Vec<f64>,
}
impl OrderedBatch {
    pub fn new(channel_count: usize) -> Self {
        Self {
            channel_count,
            samples: Vec::new(),
            timestamps: Vec::new(),
        }
    }
    pub fn from_chunk(channel_count: usize, chunk: Chunk) -> Result<Self, StreamError> {
        let mut batch = Self::new(channel_count);
        batch.extend(chunk)?;
        Ok(batch)
    }
    /// Appends a chunk after the samples already held; rejected chunks leave the batch untouched.
    pub fn extend(&mut self, chunk: Chunk) -> Result<(), StreamError> {
        chunk.validate(self.channel_count)?;
        self.samples.extend(chunk.samples);
        self.timestamps.extend(chunk.timestamps);
        Ok(())
    }
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
    pub fn samples(&self) -> &[Vec<f64>] {
        &self.samples
    }
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }
    pub fn iter(&self) -> impl Iterator<Item = (&[f64], f64)> {
        self.samples
            .iter()
            .map(Vec::as_slice)
            .zip(self.timestamps.iter().copied())
    }
}
/// Drains every chunk a source has ready into one ordered batch.
pub struct SampleAggregator<S: ChunkSource> {
    source: S,
    max_samples: Option<usize>,
    rejected_chunks: u64,
    held_error: Option<StreamError>,
}
impl<S: ChunkSource> SampleAggregator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            max_samples: None,
            rejected_chunks: 0,
            held_error: None,
        }
    }
    /// Stop polling once this many samples were seen in a cycle. Whatever the
    /// source still holds is picked up by the next cycle, so nothing is dropped.
    pub fn with_max_samples(mut self, max_samples: Option<usize>) -> Self {
        self.max_samples = max_samples.map(|m| m.max(1));
        self
    }
    pub fn channel_count(&self) -> usize {
        self.source.channel_count()
    }
    pub fn rejected_chunks(&self) -> u64 {
        self.rejected_chunks
    }
    pub fn source(&self) -> &S {
        &self.source
    }
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
    /// Takes the source error held back by the last `drain`, if any.
    pub fn take_error(&mut self) -> Option<StreamError> {
        self.held_error.take()
    }
    /// Polls until the source reports an empty chunk (or the per-cycle cap is
    /// hit) and concatenates the results in arrival order.
    ///
    /// Malformed chunks are logged and skipped. A source error with nothing
    /// gathered yet is returned directly. After samples were gathered the
    /// batch is returned and the error is held: callers pick it up with
    /// [`take_error`](Self::take_error), otherwise the next `drain` returns it.
    pub fn drain(&mut self) -> Result<OrderedBatch, StreamError> {
        if let Some(err) = self.held_error.take() {
            return Err(err);
        }
        let mut batch = OrderedBatch::new(self.source.channel_count());
        let mut seen = 0usize;
        loop {
            let chunk = match self.source.poll_chunk() {
                Ok(chunk) => chunk,
                Err(err) if batch.is_empty() => return Err(err),
                Err(err) => {
                    debug!("holding source error behind {} samples: {err}", batch.len());
                    self.held_error = Some(err);
                    break;
                }
            };
            if chunk.is_empty() {
                break;
            }
            seen += chunk.len().max(1);
            if let Err(err) = batch.extend(chunk) {
                self.rejected_chunks += 1;
                warn!("dropping chunk: {err}");
            }
            if self.max_samples.is_some_and(|cap| seen >= cap) {
                debug!("drain cap reached after {seen} samples");
                break;
            }
        }
        Ok(batch)
    }
}
