pub mod scaler;
mod worker;

pub use scaler::{AutoScaler, ScalingDecision};

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::{
    ProcessError, QueueConfig, QueueError, QueueEvent, QueueResult, QueuedItem, WorkerId,
    backend::QueueBackend,
    dead_letter::DeadLetterStore,
    observability::ObservabilityLayer,
    processor::Processor,
};

use worker::{CurrentItem, Worker};

/// State shared by the queue façade and every worker
pub(crate) struct Shared<P: Send + 'static> {
    pub(crate) backend: Arc<dyn QueueBackend<P>>,
    pub(crate) dead_letters: DeadLetterStore<P>,
    pub(crate) observability: ObservabilityLayer,
    pub(crate) config: QueueConfig,
    /// Items currently inside a processor call
    pub(crate) in_flight: AtomicUsize,
}

impl<P: Clone + Send + Sync + 'static> Shared<P> {
    pub(crate) fn new(config: QueueConfig, backend: Arc<dyn QueueBackend<P>>) -> Self {
        Self {
            backend,
            dead_letters: DeadLetterStore::new(config.dead_letter_capacity),
            observability: ObservabilityLayer::new(config.event_capacity, config.latency_window),
            config,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Retry path: re-queue at the back of its level or dead-letter it
    pub(crate) async fn handle_failure(&self, mut item: QueuedItem<P>, err: ProcessError) {
        let stats = self.observability.stats();

        if item.record_failure() {
            warn!(
                item_id = %item.id,
                retry_count = item.retry_count,
                max_retries = item.max_retries,
                error = %err,
                "processing failed, re-queueing"
            );
            stats.increment_retried();
            self.observability.emit(QueueEvent::Retrying {
                item_id: item.id.clone(),
                retry_count: item.retry_count,
                error: err.to_string(),
                at: Utc::now(),
            });
            self.backend.push(item).await;
        } else {
            error!(
                item_id = %item.id,
                retry_count = item.retry_count,
                error = %err,
                "retries exhausted, moving to dead-letter store"
            );
            stats.increment_failed();
            self.observability.emit(QueueEvent::DeadLettered {
                item_id: item.id.clone(),
                error: err.to_string(),
                at: Utc::now(),
            });
            if let Some(evicted) = self.dead_letters.push(item, err.to_string()) {
                warn!(item_id = %evicted.item.id, "dead-letter store full, evicted oldest entry");
            }
        }
    }
}

/// Handle for managing one worker's lifecycle
struct WorkerHandle<P> {
    id: WorkerId,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: JoinHandle<()>,
    current: CurrentItem<P>,
}

impl<P> WorkerHandle<P> {
    /// Ask the worker to exit after its current iteration
    fn signal(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

struct PoolState<P: Send + 'static> {
    running: bool,
    runtime: Option<Handle>,
    processor: Option<Arc<dyn Processor<P>>>,
    active: Vec<WorkerHandle<P>>,
    /// Scaled-down workers still finishing an in-flight item
    retiring: Vec<WorkerHandle<P>>,
}

/// Dynamic set of workers sized by the auto-scaler
pub struct WorkerPool<P: Send + 'static> {
    shared: Arc<Shared<P>>,
    scaler: AutoScaler,
    state: Mutex<PoolState<P>>,
    worker_count: AtomicUsize,
    next_worker_id: AtomicU64,
}

impl<P: Clone + Send + Sync + 'static> WorkerPool<P> {
    pub(crate) fn new(shared: Arc<Shared<P>>) -> Self {
        let config = &shared.config;
        let scaler =
            AutoScaler::new(config.min_workers, config.max_workers, config.scaling_threshold)
                .with_cooldown(config.scaling_cooldown);

        Self {
            shared,
            scaler,
            state: Mutex::new(PoolState {
                running: false,
                runtime: None,
                processor: None,
                active: Vec::new(),
                retiring: Vec::new(),
            }),
            worker_count: AtomicUsize::new(0),
            next_worker_id: AtomicU64::new(1),
        }
    }

    /// Spawn `min_workers` workers on the current tokio runtime
    pub fn start(self: &Arc<Self>, processor: Arc<dyn Processor<P>>) -> QueueResult<()> {
        let runtime = Handle::try_current()
            .map_err(|e| QueueError::Internal(format!("no tokio runtime available: {}", e)))?;

        let mut state = self.state.lock();
        if state.running {
            return Err(QueueError::AlreadyRunning);
        }

        state.running = true;
        state.runtime = Some(runtime);
        state.processor = Some(processor);

        for _ in 0..self.scaler.min_workers() {
            self.spawn_worker(&mut state);
        }
        self.worker_count.store(state.active.len(), Ordering::SeqCst);

        info!(
            workers = state.active.len(),
            min_workers = self.scaler.min_workers(),
            max_workers = self.scaler.max_workers(),
            "worker pool started"
        );
        Ok(())
    }

    /// Signal every worker and wait for them, bounded by `shutdown_timeout`.
    /// Workers still running at the deadline are aborted and their in-flight
    /// item goes down the retry path.
    pub async fn stop(&self) -> QueueResult<()> {
        let mut handles = {
            let mut state = self.state.lock();
            if !state.running {
                return Ok(());
            }
            state.running = false;
            state.processor = None;
            state.runtime = None;

            let mut handles: Vec<WorkerHandle<P>> = state.active.drain(..).collect();
            handles.extend(state.retiring.drain(..));
            handles
        };
        self.worker_count.store(0, Ordering::SeqCst);

        for handle in handles.iter_mut() {
            handle.signal();
        }

        let deadline = tokio::time::Instant::now() + self.shared.config.shutdown_timeout;
        let total = handles.len();
        let mut aborted = 0;

        for handle in handles {
            let WorkerHandle { id, mut join_handle, current, .. } = handle;
            match tokio::time::timeout_at(deadline, &mut join_handle).await {
                Ok(Ok(())) => debug!(worker_id = %id, "worker joined"),
                Ok(Err(e)) => warn!(worker_id = %id, "worker task ended abnormally: {}", e),
                Err(_) => {
                    join_handle.abort();
                    aborted += 1;
                    warn!(worker_id = %id, "worker missed shutdown deadline, aborted");

                    let reclaimed = current.lock().take();
                    if let Some(item) = reclaimed {
                        warn!(
                            worker_id = %id,
                            item_id = %item.id,
                            "reclaiming in-flight item from aborted worker"
                        );
                        self.shared.handle_failure(item, ProcessError::Aborted).await;
                    }
                }
            }
        }

        info!(workers = total, aborted, "worker pool stopped");

        if aborted > 0 {
            return Err(QueueError::WorkerJoin(format!(
                "{} of {} worker(s) aborted after shutdown timeout",
                aborted, total
            )));
        }
        Ok(())
    }

    /// Run one auto-scaler check and apply its decision
    pub fn check_scaling(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if !state.running {
            return;
        }

        state.retiring.retain(|handle| !handle.join_handle.is_finished());

        let queue_size = self.shared.backend.len();
        match self.scaler.decide(queue_size, state.active.len()) {
            ScalingDecision::ScaleUp => {
                let worker_id = self.spawn_worker(&mut state);
                let worker_count = state.active.len();
                info!(%worker_id, worker_count, queue_size, "scaled up");
                self.shared.observability.emit(QueueEvent::ScaledUp {
                    worker_count,
                    queue_size,
                    at: Utc::now(),
                });
            }
            ScalingDecision::ScaleDown => {
                if let Some(mut handle) = state.active.pop() {
                    handle.signal();
                    let worker_count = state.active.len();
                    info!(worker_id = %handle.id, worker_count, "scaled down");
                    state.retiring.push(handle);
                    self.shared.observability.emit(QueueEvent::ScaledDown {
                        worker_count,
                        at: Utc::now(),
                    });
                }
            }
            ScalingDecision::Hold => {}
        }

        self.worker_count.store(state.active.len(), Ordering::SeqCst);
    }

    fn spawn_worker(self: &Arc<Self>, state: &mut PoolState<P>) -> WorkerId {
        let id = WorkerId(self.next_worker_id.fetch_add(1, Ordering::Relaxed));

        let (Some(runtime), Some(processor)) = (state.runtime.clone(), state.processor.clone())
        else {
            // Only reachable while stopped; callers check `running` first
            error!(worker_id = %id, "cannot spawn worker on a stopped pool");
            return id;
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let current: CurrentItem<P> = Arc::new(Mutex::new(None));
        let worker = Worker::new(
            id,
            self.shared.clone(),
            Arc::downgrade(self),
            processor,
            current.clone(),
            shutdown_rx,
        );
        let span = info_span!("worker", worker_id = %id);
        let join_handle = runtime.spawn(worker.run().instrument(span));

        state.active.push(WorkerHandle {
            id,
            shutdown_tx: Some(shutdown_tx),
            join_handle,
            current,
        });
        id
    }

    /// Workers currently counted as active (retiring ones excluded)
    pub fn worker_count(&self) -> usize {
        self.worker_count.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn scaler(&self) -> &AutoScaler {
        &self.scaler
    }
}
