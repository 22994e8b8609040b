use std::time::Duration;

use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Infrastructure errors for queue operations
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Workers are already running")]
    AlreadyRunning,

    #[error("Worker join error: {0}")]
    WorkerJoin(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Processing outcome errors - every variant takes the retry path
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessError {
    /// Processor returned an error
    #[error("Processing failed: {0}")]
    Failed(String),

    /// Processor returned `false`
    #[error("Processor rejected the item")]
    Rejected,

    /// Processor exceeded the processing deadline
    #[error("Processing timed out after {0:?}")]
    TimedOut(Duration),

    /// Processor panicked
    #[error("Processor panicked: {0}")]
    Panicked(String),

    /// Worker was aborted at the shutdown deadline mid-item
    #[error("Worker aborted at shutdown deadline")]
    Aborted,
}

impl ProcessError {
    /// Create a failure from any message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Build a panic error from a caught panic payload
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(msg)
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
