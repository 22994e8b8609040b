use pulse_queue::QueueError;
use thiserror::Error;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failures raised by message sources
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Stream disconnected: {0}")]
    Disconnected(String),

    #[error("Malformed record on line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Gave up after {attempts} reconnect attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl SourceError {
    /// Whether reconnecting may clear the error
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Disconnected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connection_problems_are_transient() {
        assert!(SourceError::Connection("refused".into()).is_transient());
        assert!(SourceError::Disconnected("eof".into()).is_transient());
        assert!(!SourceError::Malformed { line: 3, reason: "bad".into() }.is_transient());
        assert!(!SourceError::RetriesExhausted { attempts: 5, last_error: "x".into() }.is_transient());
    }
}
