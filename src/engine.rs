// src/engine.rs
use crate::drivers::{ChunkSource, Session, SnapshotConsumer, StreamError};
use crate::types::StopSignal;
use std::thread::{self, JoinHandle};

/// Owner-side handle for a session running on its own thread.
pub struct SessionHandle {
    stop: StopSignal,
    join: JoinHandle<Result<(), StreamError>>,
}

impl SessionHandle {
    /// Takes effect before the next tick; a tick in flight completes.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub fn join(self) -> Result<(), StreamError> {
        self.join
            .join()
            .map_err(|_| StreamError::ConnectionLost("ingestion thread panicked".into()))?
    }
}

// Ingestion runs on a dedicated thread; consumers read through their own sync (e.g. SharedSnapshot)
pub fn spawn<S, C>(mut session: Session<S, C>) -> Result<SessionHandle, StreamError>
where
    S: ChunkSource + Send + 'static,
    C: SnapshotConsumer + Send + 'static,
{
    let stop = session.stop_signal();
    let join = thread::Builder::new()
        .name(format!("ingest-{}", session.info().name))
        .spawn(move || session.run())?;
    Ok(SessionHandle { stop, join })
}
