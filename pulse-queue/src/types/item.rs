use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemId, Priority};

/// Caller-supplied annotations, passed through the queue unchanged
pub type Metadata = HashMap<String, String>;

/// Default retry budget for an item
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Lifecycle of a queued item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Waiting in the backend
    Pending,

    /// Handed to a worker
    Processing,

    /// Processor reported success
    Succeeded,

    /// Failed and re-entered the back of its priority FIFO
    Retrying,

    /// Retry budget exhausted, moved to the dead-letter store
    DeadLettered,
}

impl ItemState {
    /// Check if the item will never be processed again automatically
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::DeadLettered)
    }

    /// Get the state name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Retrying => "retrying",
            Self::DeadLettered => "dead_lettered",
        }
    }
}

/// A unit of work held by the queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedItem<P> {
    /// Assigned at enqueue time
    pub id: ItemId,

    /// Opaque caller payload
    pub payload: P,

    /// Ordering level
    pub priority: Priority,

    /// When the item was first accepted
    pub enqueued_at: DateTime<Utc>,

    /// Failed processing attempts so far
    pub retry_count: u32,

    /// Retry budget, fixed at enqueue time
    pub max_retries: u32,

    /// Pass-through annotations
    pub metadata: Metadata,
}

impl<P> QueuedItem<P> {
    /// Create a new item from enqueue options
    pub fn new(payload: P, options: EnqueueOptions) -> Self {
        Self {
            id: ItemId::new(),
            payload,
            priority: options.priority,
            enqueued_at: Utc::now(),
            retry_count: 0,
            max_retries: options.max_retries,
            metadata: options.metadata,
        }
    }

    /// Current attempt number, starting at 1
    pub fn attempt(&self) -> u32 {
        self.retry_count + 1
    }

    /// True once the failure count has passed the retry budget
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count > self.max_retries
    }

    /// Count one failed attempt; returns whether another attempt is allowed
    pub fn record_failure(&mut self) -> bool {
        self.retry_count = self.retry_count.saturating_add(1);
        !self.retries_exhausted()
    }

    /// Look up a metadata value
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Per-item options accepted by `enqueue_with`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueOptions {
    pub priority: Priority,
    pub max_retries: u32,
    pub metadata: Metadata,
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self {
            priority: Priority::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            metadata: Metadata::new(),
        }
    }
}

impl EnqueueOptions {
    /// Options with the given priority and default retry budget
    pub fn new(priority: Priority) -> Self {
        Self {
            priority,
            ..Default::default()
        }
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the maximum retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Add a metadata entry
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace all metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_item_starts_with_zero_retries() {
        let item = QueuedItem::new("payload", EnqueueOptions::new(Priority::High));
        assert_eq!(item.retry_count, 0);
        assert_eq!(item.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(item.priority, Priority::High);
        assert_eq!(item.attempt(), 1);
    }

    #[test]
    fn retry_budget_allows_exactly_max_retries() {
        let mut item = QueuedItem::new((), EnqueueOptions::default().with_max_retries(2));

        assert!(item.record_failure());
        assert!(item.record_failure());
        assert!(!item.record_failure());
        assert!(item.retries_exhausted());
        assert_eq!(item.retry_count, item.max_retries + 1);
    }

    #[test]
    fn zero_retry_budget_dead_letters_on_first_failure() {
        let mut item = QueuedItem::new((), EnqueueOptions::default().with_max_retries(0));
        assert!(!item.record_failure());
    }

    #[test]
    fn metadata_passes_through() {
        let item = QueuedItem::new(
            1u32,
            EnqueueOptions::default().with_meta("channel", "#esports"),
        );
        assert_eq!(item.meta("channel"), Some("#esports"));
        assert_eq!(item.meta("missing"), None);
    }

    #[test]
    fn terminal_states() {
        assert!(ItemState::Succeeded.is_terminal());
        assert!(ItemState::DeadLettered.is_terminal());
        assert!(!ItemState::Retrying.is_terminal());
        assert_eq!(ItemState::DeadLettered.name(), "dead_lettered");
    }
}
