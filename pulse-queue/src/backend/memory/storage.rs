use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::{
    Priority, QueuedItem,
    backend::{PriorityDepths, QueueBackend},
};

/// In-memory backend: one FIFO per priority level behind a single lock
pub struct MemoryBackend<P> {
    /// Indexed by `Priority::index()`
    levels: Mutex<[VecDeque<QueuedItem<P>>; 4]>,

    /// Wakes poppers waiting on an empty queue
    available: Notify,
}

impl<P> MemoryBackend<P> {
    pub fn new() -> Self {
        Self {
            levels: Mutex::new([
                VecDeque::new(),
                VecDeque::new(),
                VecDeque::new(),
                VecDeque::new(),
            ]),
            available: Notify::new(),
        }
    }

    fn take_highest(&self) -> Option<QueuedItem<P>> {
        let mut levels = self.levels.lock();
        Priority::descending()
            .iter()
            .find_map(|priority| levels[priority.index()].pop_front())
    }
}

impl<P> Default for MemoryBackend<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: Send + 'static> QueueBackend<P> for MemoryBackend<P> {
    async fn push(&self, item: QueuedItem<P>) {
        {
            let mut levels = self.levels.lock();
            levels[item.priority.index()].push_back(item);
        }
        self.available.notify_one();
    }

    async fn pop(&self, wait: Duration) -> Option<QueuedItem<P>> {
        if let Some(item) = self.take_highest() {
            return Some(item);
        }

        // Register interest before the second check so a push racing with
        // us cannot be missed.
        let notified = self.available.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if let Some(item) = self.take_highest() {
            return Some(item);
        }

        let _ = tokio::time::timeout(wait, notified).await;
        self.take_highest()
    }

    fn try_pop(&self) -> Option<QueuedItem<P>> {
        self.take_highest()
    }

    fn len(&self) -> usize {
        self.levels.lock().iter().map(VecDeque::len).sum()
    }

    fn depths(&self) -> PriorityDepths {
        let levels = self.levels.lock();
        PriorityDepths {
            low: levels[Priority::Low.index()].len(),
            normal: levels[Priority::Normal.index()].len(),
            high: levels[Priority::High.index()].len(),
            critical: levels[Priority::Critical.index()].len(),
        }
    }

    fn clear(&self) -> usize {
        let mut levels = self.levels.lock();
        let removed = levels.iter().map(VecDeque::len).sum();
        for level in levels.iter_mut() {
            level.clear();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EnqueueOptions;
    use std::sync::Arc;

    fn item(label: &'static str, priority: Priority) -> QueuedItem<&'static str> {
        QueuedItem::new(label, EnqueueOptions::new(priority))
    }

    #[tokio::test]
    async fn pop_prefers_highest_priority() {
        let backend = MemoryBackend::new();
        backend.push(item("low", Priority::Low)).await;
        backend.push(item("critical", Priority::Critical)).await;
        backend.push(item("normal", Priority::Normal)).await;
        backend.push(item("high", Priority::High)).await;

        let order: Vec<_> = std::iter::from_fn(|| backend.try_pop())
            .map(|i| i.payload)
            .collect();
        assert_eq!(order, vec!["critical", "high", "normal", "low"]);
    }

    #[tokio::test]
    async fn fifo_within_a_level() {
        let backend = MemoryBackend::new();
        for label in ["a", "b", "c"] {
            backend.push(item(label, Priority::Normal)).await;
        }

        assert_eq!(backend.pop(Duration::ZERO).await.map(|i| i.payload), Some("a"));
        assert_eq!(backend.pop(Duration::ZERO).await.map(|i| i.payload), Some("b"));
        assert_eq!(backend.pop(Duration::ZERO).await.map(|i| i.payload), Some("c"));
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn len_and_depths_track_every_level() {
        let backend = MemoryBackend::new();
        backend.push(item("a", Priority::Low)).await;
        backend.push(item("b", Priority::Low)).await;
        backend.push(item("c", Priority::Critical)).await;

        let depths = backend.depths();
        assert_eq!(depths.low, 2);
        assert_eq!(depths.critical, 1);
        assert_eq!(depths.get(Priority::Normal), 0);
        assert_eq!(depths.total(), 3);
        assert_eq!(backend.len(), 3);

        assert_eq!(backend.clear(), 3);
        assert_eq!(backend.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pop_times_out_on_empty_queue() {
        let backend: MemoryBackend<()> = MemoryBackend::new();
        let started = tokio::time::Instant::now();

        assert!(backend.pop(Duration::from_secs(1)).await.is_none());
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn waiting_pop_wakes_on_push() {
        let backend = Arc::new(MemoryBackend::new());

        let waiter = {
            let backend = backend.clone();
            tokio::spawn(async move { backend.pop(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        backend.push(item("late", Priority::Normal)).await;

        let popped = waiter.await.unwrap();
        assert_eq!(popped.map(|i| i.payload), Some("late"));
    }
}
