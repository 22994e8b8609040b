//! # pulse-queue: in-process priority message queue
//!
//! A four-level priority queue drained by an auto-scaling pool of tokio
//! workers. Failed items are retried a bounded number of times and then
//! parked in a capacity-bounded dead-letter store.
//!
//! ## Features
//!
//! - **Strict priority**: `Critical` before `High` before `Normal` before `Low`, FIFO within a level
//! - **Auto-scaling**: one worker added per check while the queue is deep, one retired when it is empty
//! - **Bounded retries**: failures, timeouts and processor panics all take the same retry path
//! - **Dead letters**: the oldest entry is evicted once the store is full
//! - **Rate limiting**: optional fixed one-second admission window at enqueue
//! - **Observability**: live statistics plus a broadcast stream of [`QueueEvent`]s
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pulse_queue::prelude::*;
//!
//! # async fn demo() -> QueueResult<()> {
//! let queue: MessageQueue<String> = MessageQueue::new(QueueConfig::default().with_workers(1, 4))?;
//!
//! queue
//!     .start_workers(|item: QueuedItem<String>| async move {
//!         println!("{}", item.payload);
//!         Ok::<bool, ProcessError>(true)
//!     })
//!     .await?;
//!
//! queue.enqueue("gg wp".to_string(), Priority::High).await;
//!
//! let stats = queue.get_stats();
//! println!("{} enqueued, {} workers", stats.total_enqueued, stats.worker_count);
//!
//! queue.stop_workers().await?;
//! # Ok(())
//! # }
//! ```

pub mod types;
pub mod error;
pub mod config;
pub mod backend;
pub mod ratelimit;
pub mod dead_letter;
pub mod processor;
pub mod pool;
pub mod queue;
pub mod observability;

// Core API exports
pub use queue::MessageQueue;
pub use types::{
    ItemId, WorkerId, Priority, ItemState, QueuedItem, EnqueueOptions, Metadata,
    QueueEvent, DEFAULT_MAX_RETRIES,
};
pub use error::{QueueError, QueueResult, ProcessError};
pub use config::QueueConfig;
pub use backend::{QueueBackend, PriorityDepths};
pub use processor::Processor;
pub use dead_letter::{DeadLetter, DeadLetterStore};
pub use ratelimit::RateLimiter;
pub use pool::{AutoScaler, ScalingDecision, WorkerPool};

#[cfg(feature = "memory")]
pub use backend::MemoryBackend;

// Observability exports
pub use observability::{ObservabilityLayer, QueueStats, StatsAggregator};

#[cfg(feature = "tracing-basic")]
pub use observability::init_tracing;

/// Everything needed to build a queue and a processor
pub mod prelude {
    pub use crate::{
        MessageQueue, QueueConfig, Processor, QueueBackend
    };

    pub use crate::{
        QueuedItem, EnqueueOptions, ItemId, Priority, QueueEvent, QueueStats, DeadLetter
    };

    pub use crate::{ProcessError, QueueError, QueueResult};

    pub use async_trait::async_trait;
}
