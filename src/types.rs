// src/types.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Lifecycle of one stream connection
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ConnectionState {
    Connecting,
    Prefilling,
    Streaming,
    Closed,
}

// Messages the ingestion thread reports back to whoever is watching
#[derive(Clone, Debug)]
pub enum SessionEvent {
    State(ConnectionState),
    Prefilled { samples: usize },
    ChunksRejected(u64),
    Closed { reason: Option<String> },
}

/// Shared flag raised from outside to stop prefill or streaming.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
