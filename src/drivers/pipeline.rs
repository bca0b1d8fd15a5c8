use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use log::{debug, error, warn};
use crate::drivers::aggregator::SampleAggregator;
use crate::drivers::buffer::{RingBuffer, Snapshot};
use crate::drivers::source::ChunkSource;
use crate::drivers::StreamError;
/// Receives the rolling window once per tick. Must treat it as read-only.
///
/// The snapshot is built once per tick and shared; clone the `Arc` to keep it.
pub trait SnapshotConsumer {
    fn on_update(&mut self, snapshot: &Arc<Snapshot>);
    /// Called once when streaming ends on a fatal source error.
    fn on_closed(&mut self, _reason: &StreamError) {}
}
/// Cross-thread consumer: each tick swaps in a fresh `Arc<Snapshot>`, so a
/// reader on another thread only ever sees a complete window.
#[derive(Clone, Default)]
pub struct SharedSnapshot {
    latest: Arc<RwLock<Option<Arc<Snapshot>>>>,
    updates: Arc<AtomicU64>,
    closed: Arc<RwLock<Option<String>>>,
}
impl SharedSnapshot {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }
    pub fn closed_reason(&self) -> Option<String> {
        self.closed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
impl SnapshotConsumer for SharedSnapshot {
    fn on_update(&mut self, snapshot: &Arc<Snapshot>) {
        let mut latest = self.latest.write().unwrap_or_else(PoisonError::into_inner);
        *latest = Some(Arc::clone(snapshot));
        drop(latest);
        self.updates.fetch_add(1, Ordering::Release);
    }
    fn on_closed(&mut self, reason: &StreamError) {
        *self.closed.write().unwrap_or_else(PoisonError::into_inner) = Some(reason.to_string());
    }
}
/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub appended: usize,
    pub rejected_chunks: u64,
}
/// One ingestion-and-notify step: drain, append, publish.
pub struct UpdateCycle<S: ChunkSource, C: SnapshotConsumer> {
    aggregator: SampleAggregator<S>,
    consumer: C,
}
impl<S: ChunkSource, C: SnapshotConsumer> UpdateCycle<S, C> {
    pub fn new(aggregator: SampleAggregator<S>, consumer: C) -> Self {
        Self {
            aggregator,
            consumer,
        }
    }
    pub fn aggregator_mut(&mut self) -> &mut SampleAggregator<S> {
        &mut self.aggregator
    }
    pub fn consumer(&self) -> &C {
        &self.consumer
    }
    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }
    /// Runs a single tick against `buffer`. The consumer is notified even when
    /// nothing new arrived or the source failed; samples gathered ahead of a
    /// source error are appended first. Fatal errors then go to `on_closed`,
    /// and any source error is returned after the update.
    pub fn tick(&mut self, buffer: &mut RingBuffer) -> Result<TickReport, StreamError> {
        let (batch, failure) = match self.aggregator.drain() {
            Ok(batch) => (Some(batch), self.aggregator.take_error()),
            Err(err) => (None, Some(err)),
        };
        let appended = match batch {
            Some(batch) => buffer.append(&batch)?,
            None => 0,
        };
        if appended > 0 {
            debug!("tick appended {appended} samples");
        }
        self.consumer.on_update(&Arc::new(buffer.snapshot()));
        if let Some(err) = failure {
            if err.is_fatal() {
                error!("source failed: {err}");
                self.consumer.on_closed(&err);
            } else {
                warn!("tick: {err}");
            }
            return Err(err);
        }
        Ok(TickReport {
            appended,
            rejected_chunks: self.aggregator.rejected_chunks(),
        })
    }
}
