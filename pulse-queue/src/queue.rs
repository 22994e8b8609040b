use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

use crate::{
    EnqueueOptions, ItemId, Priority, QueueConfig, QueueEvent, QueueResult, QueuedItem,
    backend::{PriorityDepths, QueueBackend},
    dead_letter::DeadLetter,
    observability::{BoxStream, QueueStats},
    pool::{Shared, WorkerPool},
    processor::Processor,
    ratelimit::RateLimiter,
};

/// Priority message queue with an auto-scaling worker pool.
///
/// Cloning is cheap; clones share the same queue, pool and statistics.
pub struct MessageQueue<P: Send + 'static> {
    shared: Arc<Shared<P>>,
    pool: Arc<WorkerPool<P>>,
    limiter: Arc<RateLimiter>,
}

impl<P: Send + 'static> Clone for MessageQueue<P> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            pool: self.pool.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

impl<P: Clone + Send + Sync + 'static> MessageQueue<P> {
    /// Create a queue backed by the in-memory priority backend
    #[cfg(feature = "memory")]
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        Self::with_backend(config, Arc::new(crate::backend::MemoryBackend::new()))
    }

    /// Create a queue over a custom backend
    pub fn with_backend(
        config: QueueConfig,
        backend: Arc<dyn QueueBackend<P>>,
    ) -> QueueResult<Self> {
        config.validate()?;

        let limiter = match config.max_messages_per_second {
            Some(limit) => RateLimiter::with_limit(limit),
            None => RateLimiter::new(),
        };
        let shared = Arc::new(Shared::new(config, backend));
        let pool = Arc::new(WorkerPool::new(shared.clone()));

        Ok(Self {
            shared,
            pool,
            limiter: Arc::new(limiter),
        })
    }

    /// Enqueue with the configured default retry budget.
    ///
    /// The id is returned even when the rate limiter drops the item.
    pub async fn enqueue(&self, payload: P, priority: Priority) -> ItemId {
        let options = EnqueueOptions::new(priority)
            .with_max_retries(self.shared.config.default_max_retries);
        self.enqueue_with(payload, options).await
    }

    /// Enqueue with explicit priority, retry budget and metadata.
    ///
    /// Items denied by the rate limiter are dropped and counted; the id is
    /// returned either way.
    #[instrument(skip(self, payload, options), fields(priority = %options.priority))]
    pub async fn enqueue_with(&self, payload: P, options: EnqueueOptions) -> ItemId {
        let item = QueuedItem::new(payload, options);
        let item_id = item.id.clone();
        let priority = item.priority;
        let stats = self.shared.observability.stats();

        if !self.limiter.admit() {
            stats.increment_rate_limited();
            debug!(%item_id, "rate limit exceeded, item dropped");
            self.shared.observability.emit(QueueEvent::RateLimited {
                item_id: item_id.clone(),
                priority,
                at: Utc::now(),
            });
            return item_id;
        }

        self.shared.backend.push(item).await;
        stats.increment_enqueued();
        debug!(%item_id, "item enqueued");
        self.shared.observability.emit(QueueEvent::Enqueued {
            item_id: item_id.clone(),
            priority,
            at: Utc::now(),
        });

        self.pool.check_scaling();
        item_id
    }

    /// Start `min_workers` workers running `processor`
    #[instrument(skip(self, processor))]
    pub async fn start_workers<T>(&self, processor: T) -> QueueResult<()>
    where
        T: Processor<P>,
    {
        self.start_workers_arc(Arc::new(processor))
    }

    /// Start workers with an already shared processor
    pub fn start_workers_arc(&self, processor: Arc<dyn Processor<P>>) -> QueueResult<()> {
        self.pool.start(processor)
    }

    /// Stop all workers, waiting up to `shutdown_timeout` for in-flight items.
    /// Calling this on a stopped queue is a no-op.
    #[instrument(skip(self))]
    pub async fn stop_workers(&self) -> QueueResult<()> {
        self.pool.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_running()
    }

    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    /// Point-in-time statistics
    pub fn get_stats(&self) -> QueueStats {
        self.shared
            .observability
            .stats()
            .snapshot(self.shared.backend.depths(), self.pool.worker_count())
    }

    pub fn len(&self) -> usize {
        self.shared.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.backend.is_empty()
    }

    pub fn depths(&self) -> PriorityDepths {
        self.shared.backend.depths()
    }

    /// Items currently inside a processor call
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// Copy of the dead-letter store, oldest first
    pub fn get_dead_letter_queue(&self) -> Vec<DeadLetter<P>> {
        self.shared.dead_letters.snapshot()
    }

    pub fn clear_dead_letter_queue(&self) -> usize {
        let cleared = self.shared.dead_letters.clear();
        info!(cleared, "dead-letter store cleared");
        cleared
    }

    pub fn enable_rate_limit(&self, max_messages_per_second: u32) {
        self.limiter.enable(max_messages_per_second);
        info!(max_messages_per_second, "rate limit enabled");
    }

    pub fn disable_rate_limit(&self) {
        self.limiter.disable();
        info!("rate limit disabled");
    }

    pub fn rate_limit(&self) -> Option<u32> {
        self.limiter.limit()
    }

    /// Drop every pending item; returns how many were removed
    pub fn clear(&self) -> usize {
        let cleared = self.shared.backend.clear();
        info!(cleared, "queue cleared");
        cleared
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.shared.observability.subscribe()
    }

    /// Event stream for this queue; lagged events are skipped
    pub fn event_stream(&self) -> BoxStream<QueueEvent> {
        self.shared.observability.event_stream()
    }

    /// Wait until nothing is pending or in flight. Returns `false` on timeout.
    ///
    /// Idleness must hold on two consecutive polls so a worker caught
    /// between dequeue and processing is not missed.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let poll = async {
            let mut idle_polls = 0;
            while idle_polls < 2 {
                if self.shared.backend.is_empty() && self.in_flight() == 0 {
                    idle_polls += 1;
                } else {
                    idle_polls = 0;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProcessError;
    use tokio_test::{assert_err, assert_ok};
    use tracing_test::traced_test;

    fn quiet_config() -> QueueConfig {
        QueueConfig::default()
            .with_workers(1, 1)
            .with_dequeue_wait(Duration::from_millis(20))
            .with_shutdown_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn enqueue_updates_depths_and_stats() {
        let queue: MessageQueue<&'static str> = MessageQueue::new(quiet_config()).unwrap();

        queue.enqueue("a", Priority::High).await;
        queue.enqueue("b", Priority::Low).await;

        let stats = queue.get_stats();
        assert_eq!(stats.total_enqueued, 2);
        assert_eq!(stats.queue_size, 2);
        assert_eq!(stats.depths.high, 1);
        assert_eq!(stats.depths.low, 1);
        assert_eq!(stats.worker_count, 0);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let result = MessageQueue::<u32>::new(QueueConfig::default().with_workers(3, 1));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn double_start_fails() {
        let queue: MessageQueue<u32> = MessageQueue::new(quiet_config()).unwrap();
        let processor = |_item: QueuedItem<u32>| async { Ok::<bool, ProcessError>(true) };

        assert_ok!(queue.start_workers(processor).await);
        assert_err!(queue.start_workers(processor).await);

        assert_ok!(queue.stop_workers().await);
        assert_ok!(queue.stop_workers().await);
        assert!(!queue.is_running());
    }

    #[tokio::test]
    async fn clear_drops_pending_items() {
        let queue: MessageQueue<u32> = MessageQueue::new(quiet_config()).unwrap();
        for n in 0..3 {
            queue.enqueue(n, Priority::Normal).await;
        }
        assert_eq!(queue.clear(), 3);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn eviction_from_a_full_dead_letter_store_is_logged() {
        let queue: MessageQueue<u32> = MessageQueue::new(quiet_config().with_dead_letter_capacity(1)).unwrap();
        for n in 0..2 {
            queue
                .enqueue_with(n, EnqueueOptions::new(Priority::Normal).with_max_retries(0))
                .await;
        }

        let processor = |_item: QueuedItem<u32>| async { Err::<bool, _>(ProcessError::failed("bad payload")) };
        assert_ok!(queue.start_workers(processor).await);
        assert!(queue.wait_idle(Duration::from_secs(5)).await);
        assert_ok!(queue.stop_workers().await);

        let dead = queue.get_dead_letter_queue();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].item.payload, 1);
        assert!(logs_contain("retries exhausted"));
        assert!(logs_contain("evicted oldest entry"));
    }
}
