use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::{Shared, WorkerPool};
use crate::{ProcessError, QueueEvent, QueuedItem, WorkerId, processor::Processor};

/// Item a worker is processing, reclaimable by the pool if the worker is aborted.
///
/// Whoever takes the item out of the slot owns its outcome.
pub(super) type CurrentItem<P> = Arc<Mutex<Option<QueuedItem<P>>>>;

enum Flow {
    Continue,
    Shutdown,
}

/// Holds one unit of the shared in-flight count; released on drop, abort included
struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Dequeue loop driven by one spawned task
pub(super) struct Worker<P: Send + 'static> {
    id: WorkerId,
    shared: Arc<Shared<P>>,
    pool: Weak<WorkerPool<P>>,
    processor: Arc<dyn Processor<P>>,
    current: CurrentItem<P>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl<P: Clone + Send + Sync + 'static> Worker<P> {
    pub(super) fn new(
        id: WorkerId,
        shared: Arc<Shared<P>>,
        pool: Weak<WorkerPool<P>>,
        processor: Arc<dyn Processor<P>>,
        current: CurrentItem<P>,
        shutdown_rx: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            id,
            shared,
            pool,
            processor,
            current,
            shutdown_rx,
        }
    }

    pub(super) async fn run(mut self) {
        info!(worker_id = %self.id, "worker started");
        self.shared.observability.emit(QueueEvent::WorkerStarted {
            worker_id: self.id,
            at: Utc::now(),
        });

        loop {
            if self.shutdown_requested() {
                break;
            }

            // A panic outside the processor costs at most the in-flight item
            match AssertUnwindSafe(self.run_once()).catch_unwind().await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Shutdown) => break,
                Err(panic) => {
                    self.current.lock().take();
                    let err = ProcessError::from_panic(panic);
                    error!(
                        worker_id = %self.id,
                        error = %err,
                        "worker iteration panicked, continuing"
                    );
                }
            }
        }

        info!(worker_id = %self.id, "worker stopped");
        self.shared.observability.emit(QueueEvent::WorkerStopped {
            worker_id: self.id,
            at: Utc::now(),
        });
    }

    fn shutdown_requested(&mut self) -> bool {
        match self.shutdown_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Closed) => true,
            Err(TryRecvError::Empty) => false,
        }
    }

    async fn run_once(&mut self) -> Flow {
        let wait = self.shared.config.dequeue_wait;

        let item = tokio::select! {
            biased;
            _ = &mut self.shutdown_rx => return Flow::Shutdown,
            item = self.shared.backend.pop(wait) => item,
        };

        let Some(item) = item else {
            if let Some(pool) = self.pool.upgrade() {
                pool.check_scaling();
                return Flow::Continue;
            }
            return Flow::Shutdown;
        };

        let _in_flight = InFlightGuard::enter(&self.shared.in_flight);
        *self.current.lock() = Some(item.clone());

        let Some(pool) = self.pool.upgrade() else {
            // Owning queue is gone
            self.current.lock().take();
            debug!(worker_id = %self.id, item_id = %item.id, "queue dropped, abandoning item");
            return Flow::Shutdown;
        };
        pool.check_scaling();
        drop(pool);

        self.handle(item).await;
        Flow::Continue
    }

    async fn handle(&self, item: QueuedItem<P>) {
        let timeout = self.shared.config.processing_timeout;
        let item_id = item.id.clone();
        debug!(
            worker_id = %self.id,
            %item_id,
            priority = %item.priority,
            attempt = item.attempt(),
            "processing item"
        );

        let started = Instant::now();

        let processing = tokio::time::timeout(timeout, self.processor.process(item.clone()));
        let outcome = AssertUnwindSafe(processing).catch_unwind().await;

        if self.current.lock().take().is_none() {
            debug!(worker_id = %self.id, %item_id, "item reclaimed by pool, dropping outcome");
            return;
        }

        let result = match outcome {
            Ok(Ok(Ok(true))) => Ok(()),
            Ok(Ok(Ok(false))) => Err(ProcessError::Rejected),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_elapsed)) => Err(ProcessError::TimedOut(timeout)),
            Err(panic) => Err(ProcessError::from_panic(panic)),
        };

        match result {
            Ok(()) => {
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                let stats = self.shared.observability.stats();
                stats.increment_processed();
                stats.record_latency(latency_ms);
                debug!(worker_id = %self.id, %item_id, latency_ms, "item processed");
                self.shared.observability.emit(QueueEvent::Completed {
                    item_id,
                    worker_id: self.id,
                    latency_ms,
                    at: Utc::now(),
                });
            }
            Err(err) => self.shared.handle_failure(item, err).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_flight_guard_releases_on_drop() {
        let counter = AtomicUsize::new(0);
        {
            let _a = InFlightGuard::enter(&counter);
            let _b = InFlightGuard::enter(&counter);
            assert_eq!(counter.load(Ordering::SeqCst), 2);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
