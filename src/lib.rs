// src/lib.rs
//! Rolling visualization buffer for real-time multi-channel sample streams.
//!
//! A [`drivers::ChunkSource`] hands out irregular chunks of timestamped
//! samples. Each tick, [`drivers::SampleAggregator`] drains everything
//! available, [`drivers::RingBuffer`] keeps the newest `N` rows, and a
//! [`drivers::SnapshotConsumer`] receives a consistent copy of the window.
pub mod clock;
pub mod config;
pub mod drivers;
pub mod engine;
pub mod types;

pub use config::GraphConfig;
pub use drivers::StreamError;
pub use engine::{spawn, SessionHandle};
pub use types::{ConnectionState, SessionEvent, StopSignal};
