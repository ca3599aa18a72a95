use thiserror::Error;

use crate::domain::TaskId;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("frame exceeds {0} bytes")]
    FrameTooLarge(usize),

    #[error("config: {0}")]
    Config(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// The outbound channel is gone. Never fatal: the mutation that triggered the
/// send has already been applied locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("channel disconnected")]
    Disconnected,
}
