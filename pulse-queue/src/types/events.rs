use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemId, ItemState, Priority, WorkerId};

/// Event protocol for structured observability of the queue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    /// Item was admitted and stored
    Enqueued {
        item_id: ItemId,
        priority: Priority,
        at: DateTime<Utc>,
    },

    /// Item was dropped by the rate limiter and never stored
    RateLimited {
        item_id: ItemId,
        priority: Priority,
        at: DateTime<Utc>,
    },

    /// Processor reported success
    Completed {
        item_id: ItemId,
        worker_id: WorkerId,
        latency_ms: f64,
        at: DateTime<Utc>,
    },

    /// Item failed and went back into its priority FIFO
    Retrying {
        item_id: ItemId,
        retry_count: u32,
        error: String,
        at: DateTime<Utc>,
    },

    /// Item exhausted its retries
    DeadLettered {
        item_id: ItemId,
        error: String,
        at: DateTime<Utc>,
    },

    /// Worker loop started
    WorkerStarted {
        worker_id: WorkerId,
        at: DateTime<Utc>,
    },

    /// Worker loop exited
    WorkerStopped {
        worker_id: WorkerId,
        at: DateTime<Utc>,
    },

    /// Auto-scaler added a worker
    ScaledUp {
        worker_count: usize,
        queue_size: usize,
        at: DateTime<Utc>,
    },

    /// Auto-scaler retired a worker
    ScaledDown {
        worker_count: usize,
        at: DateTime<Utc>,
    },
}

impl QueueEvent {
    /// Get event type name as string
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Enqueued { .. } => "enqueued",
            Self::RateLimited { .. } => "rate_limited",
            Self::Completed { .. } => "completed",
            Self::Retrying { .. } => "retrying",
            Self::DeadLettered { .. } => "dead_lettered",
            Self::WorkerStarted { .. } => "worker_started",
            Self::WorkerStopped { .. } => "worker_stopped",
            Self::ScaledUp { .. } => "scaled_up",
            Self::ScaledDown { .. } => "scaled_down",
        }
    }

    /// Get the item ID for item-scoped events
    pub fn item_id(&self) -> Option<&ItemId> {
        match self {
            Self::Enqueued { item_id, .. }
            | Self::RateLimited { item_id, .. }
            | Self::Completed { item_id, .. }
            | Self::Retrying { item_id, .. }
            | Self::DeadLettered { item_id, .. } => Some(item_id),
            _ => None,
        }
    }

    /// State the item entered, for item-scoped events that change it.
    /// Rate-limited items never enter the queue.
    pub fn item_state(&self) -> Option<ItemState> {
        match self {
            Self::Enqueued { .. } => Some(ItemState::Pending),
            Self::Completed { .. } => Some(ItemState::Succeeded),
            Self::Retrying { .. } => Some(ItemState::Retrying),
            Self::DeadLettered { .. } => Some(ItemState::DeadLettered),
            _ => None,
        }
    }

    /// Get the timestamp from any event
    pub fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::Enqueued { at, .. } => at,
            Self::RateLimited { at, .. } => at,
            Self::Completed { at, .. } => at,
            Self::Retrying { at, .. } => at,
            Self::DeadLettered { at, .. } => at,
            Self::WorkerStarted { at, .. } => at,
            Self::WorkerStopped { at, .. } => at,
            Self::ScaledUp { at, .. } => at,
            Self::ScaledDown { at, .. } => at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "json")]
    #[test]
    fn serializes_with_event_tag() {
        let event = QueueEvent::Retrying {
            item_id: ItemId("item-1".to_string()),
            retry_count: 2,
            error: "Processing failed: timeout".to_string(),
            at: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "retrying");
        assert_eq!(json["retry_count"], 2);
        assert_eq!(event.item_state(), Some(ItemState::Retrying));
    }

    #[test]
    fn pool_events_have_no_item() {
        let event = QueueEvent::WorkerStarted { worker_id: WorkerId(3), at: Utc::now() };
        assert!(event.item_id().is_none());
        assert!(event.item_state().is_none());
        assert_eq!(event.event_name(), "worker_started");
    }
}
