//! Bounded store of items that exhausted their retry budget.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::QueuedItem;

/// Default number of dead letters kept for inspection
pub const DEFAULT_DEAD_LETTER_CAPACITY: usize = 1000;

/// A permanently failed item and the last error it produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter<P> {
    pub item: QueuedItem<P>,
    pub error: String,
    pub dead_lettered_at: DateTime<Utc>,
}

/// Ring buffer of dead letters; the oldest entry is evicted when full
pub struct DeadLetterStore<P> {
    capacity: usize,
    entries: Mutex<VecDeque<DeadLetter<P>>>,
}

impl<P: Clone> DeadLetterStore<P> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Append a failed item, returning the evicted entry when at capacity.
    /// Eviction and append happen under the same lock.
    pub fn push(&self, item: QueuedItem<P>, error: impl Into<String>) -> Option<DeadLetter<P>> {
        let letter = DeadLetter {
            item,
            error: error.into(),
            dead_lettered_at: Utc::now(),
        };

        if self.capacity == 0 {
            return Some(letter);
        }

        let mut entries = self.entries.lock();
        let evicted = if entries.len() >= self.capacity {
            entries.pop_front()
        } else {
            None
        };
        entries.push_back(letter);
        evicted
    }

    /// Copy of all entries, oldest first
    pub fn snapshot(&self) -> Vec<DeadLetter<P>> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Remove all entries; returns how many were dropped
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
