#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::MemoryBackend;

use async_trait::async_trait;
use std::time::Duration;

use crate::{Priority, QueuedItem};

/// Number of items waiting at each priority level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PriorityDepths {
    pub low: usize,
    pub normal: usize,
    pub high: usize,
    pub critical: usize,
}

impl PriorityDepths {
    /// Depth for one level
    pub fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::Low => self.low,
            Priority::Normal => self.normal,
            Priority::High => self.high,
            Priority::Critical => self.critical,
        }
    }

    /// Sum across all levels
    pub fn total(&self) -> usize {
        self.low + self.normal + self.high + self.critical
    }
}

/// Backend trait for queue storage primitives
///
/// Implementations keep one FIFO per priority level. Dequeue order is
/// strict: the head of the highest non-empty level always wins, with no
/// aging of lower levels.
#[async_trait]
pub trait QueueBackend<P: Send + 'static>: Send + Sync {
    /// Append an item to the FIFO of its priority level
    async fn push(&self, item: QueuedItem<P>);

    /// Remove the head of the highest non-empty level, waiting up to `wait`
    /// for a push when every level is empty
    async fn pop(&self, wait: Duration) -> Option<QueuedItem<P>>;

    /// Non-waiting dequeue
    fn try_pop(&self) -> Option<QueuedItem<P>>;

    /// Total number of stored items
    fn len(&self) -> usize;

    /// Per-level item counts
    fn depths(&self) -> PriorityDepths;

    /// Drop every stored item; returns how many were removed
    fn clear(&self) -> usize;

    /// Whether nothing is stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
