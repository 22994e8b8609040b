use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use tracing::{debug, warn};

use crate::QueueEvent;

use super::StatsAggregator;

/// Type alias for boxed streams (stable Rust compatible)
pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// Event fan-out plus the shared statistics aggregator
#[derive(Clone)]
pub struct ObservabilityLayer {
    event_broadcaster: broadcast::Sender<QueueEvent>,
    stats: Arc<StatsAggregator>,
}

impl ObservabilityLayer {
    /// Create a layer with the given event buffer and latency window
    pub fn new(event_capacity: usize, latency_window: usize) -> Self {
        let (event_broadcaster, _) = broadcast::channel(event_capacity.max(1));

        Self {
            event_broadcaster,
            stats: Arc::new(StatsAggregator::new(latency_window)),
        }
    }

    /// Publish an event; having no subscribers is not an error
    pub fn emit(&self, event: QueueEvent) {
        debug!(event = event.event_name(), "queue event");
        let _ = self.event_broadcaster.send(event);
    }

    /// Raw receiver; lagging receivers see `RecvError::Lagged`
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_broadcaster.subscribe()
    }

    /// Event stream that skips over lag gaps instead of ending
    pub fn event_stream(&self) -> BoxStream<QueueEvent> {
        let stream = BroadcastStream::new(self.subscribe()).filter_map(|event| match event {
            Ok(event) => Some(event),
            Err(lagged) => {
                warn!("event subscriber lagged: {}", lagged);
                None
            }
        });
        Box::pin(stream)
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.event_broadcaster.receiver_count()
    }

    /// Shared statistics aggregator
    pub fn stats(&self) -> &Arc<StatsAggregator> {
        &self.stats
    }
}

impl Default for ObservabilityLayer {
    fn default() -> Self {
        Self::new(10_000, super::DEFAULT_LATENCY_WINDOW)
    }
}
