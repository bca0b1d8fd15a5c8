// src/drivers/mod.rs
// Ingestion core: sources, chunk merging, rolling window, per-tick cycle
pub mod aggregator;
pub mod buffer;
pub mod discovery;
pub mod error;
pub mod pipeline;
pub mod prefill;
pub mod session;
pub mod source;
// Re-exported for callers outside the module tree
pub use aggregator::{OrderedBatch, SampleAggregator};
pub use buffer::{RingBuffer, Snapshot};
pub use discovery::{format_stream_table, Discovery, LocalRegistry, StreamInfo};
pub use error::StreamError;
pub use pipeline::{SharedSnapshot, SnapshotConsumer, TickReport, UpdateCycle};
pub use prefill::PrefillSequencer;
pub use session::Session;
pub use source::{Chunk, ChunkSource, ManualSource, SimulatedSource};
