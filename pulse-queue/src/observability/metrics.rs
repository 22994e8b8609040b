use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::backend::PriorityDepths;

/// Default number of latency samples kept for averaging
pub const DEFAULT_LATENCY_WINDOW: usize = 1000;

/// Live counters and latency window for queue operations
pub struct StatsAggregator {
    total_enqueued: AtomicU64,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
    total_retried: AtomicU64,
    total_rate_limited: AtomicU64,

    latencies: Mutex<VecDeque<f64>>,
    window: usize,
    started_at: Instant,
}

impl StatsAggregator {
    pub fn new(window: usize) -> Self {
        Self {
            total_enqueued: AtomicU64::new(0),
            total_processed: AtomicU64::new(0),
            total_failed: AtomicU64::new(0),
            total_retried: AtomicU64::new(0),
            total_rate_limited: AtomicU64::new(0),
            latencies: Mutex::new(VecDeque::with_capacity(window.min(4096))),
            window: window.max(1),
            started_at: Instant::now(),
        }
    }

    pub fn increment_enqueued(&self) {
        self.total_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_processed(&self) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.total_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retried(&self) {
        self.total_retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rate_limited(&self) {
        self.total_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one processing latency, evicting the oldest sample when full
    pub fn record_latency(&self, ms: f64) {
        let mut latencies = self.latencies.lock();
        if latencies.len() >= self.window {
            latencies.pop_front();
        }
        latencies.push_back(ms);
    }

    // Getters for global counters
    pub fn total_enqueued(&self) -> u64 {
        self.total_enqueued.load(Ordering::Relaxed)
    }

    pub fn total_processed(&self) -> u64 {
        self.total_processed.load(Ordering::Relaxed)
    }

    pub fn total_failed(&self) -> u64 {
        self.total_failed.load(Ordering::Relaxed)
    }

    pub fn total_retried(&self) -> u64 {
        self.total_retried.load(Ordering::Relaxed)
    }

    pub fn total_rate_limited(&self) -> u64 {
        self.total_rate_limited.load(Ordering::Relaxed)
    }

    /// Mean of the latency window in milliseconds (0 when empty)
    pub fn average_latency(&self) -> f64 {
        let latencies = self.latencies.lock();
        if latencies.is_empty() {
            return 0.0;
        }
        latencies.iter().sum::<f64>() / latencies.len() as f64
    }

    /// Percentile of the latency window in milliseconds
    pub fn percentile_latency(&self, percentile: f64) -> Option<f64> {
        let mut sorted: Vec<f64> = self.latencies.lock().iter().copied().collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let rank = (percentile.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
        sorted.get(rank.round() as usize).copied()
    }

    /// Number of samples currently in the window
    pub fn sample_count(&self) -> usize {
        self.latencies.lock().len()
    }

    /// Processed items per second since the aggregator was created
    pub fn throughput(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed <= f64::EPSILON {
            return 0.0;
        }
        self.total_processed() as f64 / elapsed
    }

    /// Point-in-time snapshot; queue-side figures are supplied by the caller
    pub fn snapshot(&self, depths: PriorityDepths, worker_count: usize) -> QueueStats {
        QueueStats {
            timestamp: Utc::now(),
            total_enqueued: self.total_enqueued(),
            total_processed: self.total_processed(),
            total_failed: self.total_failed(),
            total_retried: self.total_retried(),
            total_rate_limited: self.total_rate_limited(),
            queue_size: depths.total(),
            depths,
            worker_count,
            avg_processing_time: self.average_latency(),
            p95_processing_time: self.percentile_latency(95.0).unwrap_or(0.0),
            messages_per_second: self.throughput(),
        }
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY_WINDOW)
    }
}

/// Snapshot of queue statistics at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub timestamp: DateTime<Utc>,
    pub total_enqueued: u64,
    pub total_processed: u64,
    pub total_failed: u64,
    pub total_retried: u64,
    pub total_rate_limited: u64,
    pub queue_size: usize,
    pub depths: PriorityDepths,
    pub worker_count: usize,
    /// Mean latency over the sample window, milliseconds
    pub avg_processing_time: f64,
    pub p95_processing_time: f64,
    pub messages_per_second: f64,
}

impl QueueStats {
    /// Share of finished items that succeeded, as a percentage
    pub fn success_rate(&self) -> f64 {
        let finished = self.total_processed + self.total_failed;
        if finished == 0 {
            100.0
        } else {
            (self.total_processed as f64 / finished as f64) * 100.0
        }
    }

    /// Items accepted but not yet finished (pending or in flight)
    pub fn in_progress(&self) -> u64 {
        self.total_enqueued
            .saturating_sub(self.total_processed + self.total_failed)
    }

    #[cfg(feature = "json")]
    pub fn to_json(&self) -> crate::QueueResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn latency_window_evicts_oldest() {
        let stats = StatsAggregator::new(3);
        for ms in [100.0, 200.0, 300.0, 400.0] {
            stats.record_latency(ms);
        }

        assert_eq!(stats.sample_count(), 3);
        assert_eq!(stats.average_latency(), 300.0);
    }

    #[test]
    fn percentile_latency() {
        let stats = StatsAggregator::new(100);
        assert_eq!(stats.percentile_latency(50.0), None);

        for ms in [300.0, 100.0, 200.0] {
            stats.record_latency(ms);
        }
        assert_eq!(stats.percentile_latency(50.0), Some(200.0));
        assert_eq!(stats.percentile_latency(100.0), Some(300.0));
    }

    #[test]
    fn empty_window_averages_to_zero() {
        let stats = StatsAggregator::default();
        assert_eq!(stats.average_latency(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn throughput_uses_elapsed_time() {
        let stats = StatsAggregator::default();
        for _ in 0..10 {
            stats.increment_processed();
        }

        tokio::time::advance(Duration::from_secs(5)).await;
        let rate = stats.throughput();
        assert!((rate - 2.0).abs() < 0.01, "rate was {rate}");
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let stats = Arc::new(StatsAggregator::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.increment_processed();
                        stats.record_latency(1.0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.total_processed(), 8000);
        assert_eq!(stats.sample_count(), DEFAULT_LATENCY_WINDOW);
    }

    #[test]
    fn snapshot_rates() {
        let stats = QueueStats {
            timestamp: Utc::now(),
            total_enqueued: 100,
            total_processed: 80,
            total_failed: 20,
            total_retried: 7,
            total_rate_limited: 3,
            queue_size: 0,
            depths: PriorityDepths::default(),
            worker_count: 1,
            avg_processing_time: 0.0,
            p95_processing_time: 0.0,
            messages_per_second: 0.0,
        };

        assert_eq!(stats.success_rate(), 80.0);
        assert_eq!(stats.in_progress(), 0);
    }
}
