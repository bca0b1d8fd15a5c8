use ndarray::{s, Array2, ArrayView1, ArrayView2};
use crate::clock::local_clock;
use crate::drivers::aggregator::OrderedBatch;
use crate::drivers::StreamError;
/// Consistent copy of the rolling window, oldest row first.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    values: Array2<f64>, // rows x channels
    timestamps: Vec<f64>,
}
impl Snapshot {
    pub fn rows(&self) -> usize {
        self.timestamps.len()
    }
    pub fn channel_count(&self) -> usize {
        self.values.ncols()
    }
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }
    /// All samples of one channel, oldest first.
    pub fn channel(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.channel_count()).then(|| self.values.column(index))
    }
    /// Row-major values, channels interleaved per sample.
    pub fn flat_values(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
    pub fn latest(&self) -> Option<(ArrayView1<'_, f64>, f64)> {
        let last = self.rows().checked_sub(1)?;
        Some((self.values.row(last), self.timestamps[last]))
    }
    /// First two channels paired as XY coordinates. Empty for single-channel streams.
    pub fn xy_points(&self) -> Vec<[f64; 2]> {
        if self.channel_count() < 2 {
            return Vec::new();
        }
        self.values
            .rows()
            .into_iter()
            .map(|row| [row[0], row[1]])
            .collect()
    }
    /// Any non-zero sample in the window. Mirrors the "draw only once data arrived" check.
    pub fn has_signal(&self) -> bool {
        self.values.iter().any(|v| *v != 0.0)
    }
}
/// Fixed-capacity rolling store of the last N samples and their timestamps.
///
/// Rows are kept in a circular arena: `head` is both the oldest row and the
/// next write position, so an append costs O(batch) rather than O(N).
pub struct RingBuffer {
    values: Array2<f64>,
    timestamps: Vec<f64>,
    head: usize,
    filled: usize,
    appended: u64,
}
impl RingBuffer {
    /// Rows start zeroed with `sentinel_time` as their timestamp.
    pub fn new(capacity: usize, channel_count: usize, sentinel_time: f64) -> Result<Self, StreamError> {
        if capacity == 0 {
            return Err(StreamError::InvalidBufferLength);
        }
        if channel_count == 0 {
            return Err(StreamError::InvalidChannelCount);
        }
        Ok(Self {
            values: Array2::zeros((capacity, channel_count)),
            timestamps: vec![sentinel_time; capacity],
            head: 0,
            filled: 0,
            appended: 0,
        })
    }
    /// Same as [`RingBuffer::new`] with the current local clock as sentinel.
    pub fn with_clock(capacity: usize, channel_count: usize) -> Result<Self, StreamError> {
        Self::new(capacity, channel_count, local_clock())
    }
    pub fn capacity(&self) -> usize {
        self.timestamps.len()
    }
    pub fn channel_count(&self) -> usize {
        self.values.ncols()
    }
    /// Rows written by real samples so far, saturating at capacity.
    pub fn valid_rows(&self) -> usize {
        self.filled
    }
    pub fn is_primed(&self) -> bool {
        self.filled == self.capacity()
    }
    /// Total samples accepted over the buffer's lifetime.
    pub fn total_appended(&self) -> u64 {
        self.appended
    }
    /// Discards the oldest `batch.len()` rows and writes the batch after the
    /// newest one. Oversized batches keep only their last `capacity` samples.
    /// An empty batch changes nothing.
    pub fn append(&mut self, batch: &OrderedBatch) -> Result<usize, StreamError> {
        if batch.channel_count() != self.channel_count() {
            return Err(StreamError::ChannelMismatch {
                expected: self.channel_count(),
                actual: batch.channel_count(),
            });
        }
        if batch.is_empty() {
            return Ok(0);
        }
        let capacity = self.capacity();
        let skip = batch.len().saturating_sub(capacity);
        for (sample, timestamp) in batch.iter().skip(skip) {
            self.values
                .row_mut(self.head)
                .assign(&ArrayView1::from(sample));
            self.timestamps[self.head] = timestamp;
            self.head = (self.head + 1) % capacity;
        }
        self.filled = (self.filled + batch.len()).min(capacity);
        self.appended += batch.len() as u64;
        Ok(batch.len())
    }
    /// Linearised copy of both stores taken in one borrow, so values and
    /// timestamps always describe the same append.
    pub fn snapshot(&self) -> Snapshot {
        let n = self.capacity();
        let h = self.head;
        let mut values = Array2::zeros((n, self.channel_count()));
        values
            .slice_mut(s![..n - h, ..])
            .assign(&self.values.slice(s![h.., ..]));
        values
            .slice_mut(s![n - h.., ..])
            .assign(&self.values.slice(s![..h, ..]));
        let mut timestamps = Vec::with_capacity(n);
        timestamps.extend_from_slice(&self.timestamps[h..]);
        timestamps.extend_from_slice(&self.timestamps[..h]);
        Snapshot { values, timestamps }
    }
}
