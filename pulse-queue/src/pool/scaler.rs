use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Outcome of one scaling check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingDecision {
    /// Spawn one more worker
    ScaleUp,
    /// Retire one worker after its in-flight item
    ScaleDown,
    /// Leave the pool as is
    Hold,
}

/// Queue-depth driven worker count policy.
///
/// Moves at most one step per check. Without a cooldown the policy has no
/// hysteresis and can oscillate under bursty load.
#[derive(Debug)]
pub struct AutoScaler {
    min_workers: usize,
    max_workers: usize,
    scaling_threshold: usize,
    cooldown: Option<Duration>,
    last_step: Mutex<Option<Instant>>,
}

impl AutoScaler {
    pub fn new(min_workers: usize, max_workers: usize, scaling_threshold: usize) -> Self {
        Self {
            min_workers,
            max_workers,
            scaling_threshold,
            cooldown: None,
            last_step: Mutex::new(None),
        }
    }

    /// Suppress steps that follow the previous one within `cooldown`
    pub fn with_cooldown(mut self, cooldown: Option<Duration>) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Pure threshold rule, ignoring the cooldown
    pub fn evaluate(&self, queue_size: usize, worker_count: usize) -> ScalingDecision {
        if queue_size > self.scaling_threshold && worker_count < self.max_workers {
            ScalingDecision::ScaleUp
        } else if queue_size == 0 && worker_count > self.min_workers {
            ScalingDecision::ScaleDown
        } else {
            ScalingDecision::Hold
        }
    }

    /// Threshold rule plus cooldown; a non-hold result counts as a step
    pub fn decide(&self, queue_size: usize, worker_count: usize) -> ScalingDecision {
        let decision = self.evaluate(queue_size, worker_count);
        if decision == ScalingDecision::Hold {
            return decision;
        }

        let now = Instant::now();
        let mut last_step = self.last_step.lock();
        if let (Some(cooldown), Some(last)) = (self.cooldown, *last_step) {
            if now.duration_since(last) < cooldown {
                debug!(
                    queue_size,
                    worker_count,
                    ?decision,
                    "scaling step suppressed by cooldown"
                );
                return ScalingDecision::Hold;
            }
        }

        *last_step = Some(now);
        decision
    }

    pub fn min_workers(&self) -> usize {
        self.min_workers
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn scaling_threshold(&self) -> usize {
        self.scaling_threshold
    }
}
