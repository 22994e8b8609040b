//! Producers of chat messages.

pub mod backoff;
pub mod jsonl;
pub mod reconnecting;
pub mod simulated;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use jsonl::JsonLinesSource;
pub use reconnecting::ReconnectingSource;
pub use simulated::SimulatedSource;

use async_trait::async_trait;

use crate::{error::SourceError, message::ChatMessage};

/// A connection-oriented stream of chat messages
#[async_trait]
pub trait MessageSource: Send {
    /// Label used in logs and ingest reports
    fn name(&self) -> &str;

    /// Establish (or re-establish) the underlying connection
    async fn connect(&mut self) -> Result<(), SourceError>;

    /// Next message, or `None` once the stream has ended
    async fn next_message(&mut self) -> Result<Option<ChatMessage>, SourceError>;
}
