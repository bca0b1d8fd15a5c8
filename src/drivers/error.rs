use std::time::Duration;
use thiserror::Error;
use crate::types::ConnectionState;
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("no stream named {name:?} found")]
    StreamNotFound { name: String },
    #[error("channel name count mismatch: stream has {expected} channels, got {actual} names")]
    ChannelNameMismatch { expected: usize, actual: usize },
    #[error("malformed chunk: {samples} samples but {timestamps} timestamps")]
    MalformedChunk { samples: usize, timestamps: usize },
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("prefill stalled at {received}/{target} samples after {waited:?}")]
    PrefillStalled {
        received: usize,
        target: usize,
        waited: Duration,
    },
    #[error("stopped before completion")]
    Cancelled,
    #[error("not allowed while {0:?}")]
    InvalidState(ConnectionState),
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("buffer length must be greater than zero")]
    InvalidBufferLength,
    #[error("stream must have at least one channel")]
    InvalidChannelCount,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
impl StreamError {
    /// Errors that end a streaming session rather than a single chunk.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StreamError::ConnectionLost(_) | StreamError::Io(_))
    }
}
impl From<serde_json::Error> for StreamError {
    fn from(value: serde_json::Error) -> Self {
        StreamError::Config(value.to_string())
    }
}
