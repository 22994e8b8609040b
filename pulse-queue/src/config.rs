use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    QueueError, QueueResult, DEFAULT_MAX_RETRIES,
    dead_letter::DEFAULT_DEAD_LETTER_CAPACITY,
    observability::DEFAULT_LATENCY_WINDOW,
};

/// Environment prefix read by [`QueueConfig::from_env`]
pub const ENV_PREFIX: &str = "PULSE_QUEUE_";

/// Configuration for the message queue and its worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Workers kept alive even when idle
    pub min_workers: usize,
    /// Upper bound for the auto-scaler
    pub max_workers: usize,
    /// Queue depth above which one more worker is added
    pub scaling_threshold: usize,
    /// Minimum time between two scaling steps; `None` scales on every check
    pub scaling_cooldown: Option<Duration>,
    /// Deadline for a single processor call
    pub processing_timeout: Duration,
    /// How long an idle worker waits on an empty queue per iteration
    pub dequeue_wait: Duration,
    /// Bound on how long `stop_workers` waits for each worker
    pub shutdown_timeout: Duration,
    /// Enqueue admissions per second; `None` disables the limiter
    pub max_messages_per_second: Option<u32>,
    /// Retry budget applied by plain `enqueue`
    pub default_max_retries: u32,
    /// Dead letters kept for inspection
    pub dead_letter_capacity: usize,
    /// Latency samples kept for averaging
    pub latency_window: usize,
    /// Buffered events per subscriber before lagging
    pub event_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            min_workers: 1,
            max_workers: 10,
            scaling_threshold: 100,
            scaling_cooldown: None,
            processing_timeout: Duration::from_secs(30),
            dequeue_wait: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(35),
            max_messages_per_second: None,
            default_max_retries: DEFAULT_MAX_RETRIES,
            dead_letter_capacity: DEFAULT_DEAD_LETTER_CAPACITY,
            latency_window: DEFAULT_LATENCY_WINDOW,
            event_capacity: 10_000,
        }
    }
}

impl QueueConfig {
    /// Set worker bounds
    pub fn with_workers(mut self, min_workers: usize, max_workers: usize) -> Self {
        self.min_workers = min_workers;
        self.max_workers = max_workers;
        self
    }

    pub fn with_scaling_threshold(mut self, threshold: usize) -> Self {
        self.scaling_threshold = threshold;
        self
    }

    pub fn with_scaling_cooldown(mut self, cooldown: Duration) -> Self {
        self.scaling_cooldown = Some(cooldown);
        self
    }

    pub fn with_processing_timeout(mut self, timeout: Duration) -> Self {
        self.processing_timeout = timeout;
        self
    }

    pub fn with_dequeue_wait(mut self, wait: Duration) -> Self {
        self.dequeue_wait = wait;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, max_messages_per_second: u32) -> Self {
        self.max_messages_per_second = Some(max_messages_per_second);
        self
    }

    pub fn with_default_max_retries(mut self, max_retries: u32) -> Self {
        self.default_max_retries = max_retries;
        self
    }

    pub fn with_dead_letter_capacity(mut self, capacity: usize) -> Self {
        self.dead_letter_capacity = capacity;
        self
    }

    pub fn with_latency_window(mut self, window: usize) -> Self {
        self.latency_window = window;
        self
    }

    /// Reject settings the pool cannot run with
    pub fn validate(&self) -> QueueResult<()> {
        if self.min_workers == 0 {
            // Below the scaling threshold nothing would ever spawn a worker
            return Err(QueueError::InvalidConfig("min_workers must be at least 1".to_string()));
        }
        if self.min_workers > self.max_workers {
            return Err(QueueError::InvalidConfig(format!(
                "min_workers ({}) exceeds max_workers ({})",
                self.min_workers, self.max_workers
            )));
        }
        if self.processing_timeout.is_zero() {
            return Err(QueueError::InvalidConfig("processing_timeout must be positive".to_string()));
        }
        if self.latency_window == 0 {
            return Err(QueueError::InvalidConfig("latency_window must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Load from `PULSE_QUEUE_*` environment variables, falling back to defaults
    pub fn from_env() -> QueueResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup (keys include the `PULSE_QUEUE_` prefix)
    pub fn from_lookup<F>(lookup: F) -> QueueResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        let config = Self {
            min_workers: parse_or(&get, "MIN_WORKERS", defaults.min_workers)?,
            max_workers: parse_or(&get, "MAX_WORKERS", defaults.max_workers)?,
            scaling_threshold: parse_or(&get, "SCALING_THRESHOLD", defaults.scaling_threshold)?,
            scaling_cooldown: parse_opt::<u64, _>(&get, "SCALING_COOLDOWN_MS")?
                .map(Duration::from_millis),
            processing_timeout: parse_opt::<u64, _>(&get, "PROCESSING_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.processing_timeout),
            dequeue_wait: parse_opt::<u64, _>(&get, "DEQUEUE_WAIT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.dequeue_wait),
            shutdown_timeout: parse_opt::<u64, _>(&get, "SHUTDOWN_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.shutdown_timeout),
            max_messages_per_second: parse_opt(&get, "MAX_MESSAGES_PER_SECOND")?,
            default_max_retries: parse_or(&get, "MAX_RETRIES", defaults.default_max_retries)?,
            dead_letter_capacity: parse_or(&get, "DEAD_LETTER_CAPACITY", defaults.dead_letter_capacity)?,
            latency_window: parse_or(&get, "LATENCY_WINDOW", defaults.latency_window)?,
            event_capacity: parse_or(&get, "EVENT_CAPACITY", defaults.event_capacity)?,
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_opt<T, G>(get: &G, name: &str) -> QueueResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            QueueError::InvalidConfig(format!("{ENV_PREFIX}{name}={raw:?}: {e}"))
        }),
    }
}

fn parse_or<T, G>(get: &G, name: &str, default: T) -> QueueResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(get, name)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = QueueConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.processing_timeout, Duration::from_secs(30));
        assert_eq!(config.max_messages_per_second, None);
        assert_eq!(config.scaling_cooldown, None);
    }

    #[test]
    fn min_above_max_is_rejected() {
        let config = QueueConfig::default().with_workers(5, 2);
        assert!(matches!(config.validate(), Err(QueueError::InvalidConfig(_))));
    }

    #[test]
    fn reads_prefixed_variables() {
        let config = QueueConfig::from_lookup(lookup(&[
            ("PULSE_QUEUE_MIN_WORKERS", "2"),
            ("PULSE_QUEUE_MAX_WORKERS", "8"),
            ("PULSE_QUEUE_PROCESSING_TIMEOUT_MS", "1500"),
            ("PULSE_QUEUE_MAX_MESSAGES_PER_SECOND", "50"),
            ("PULSE_QUEUE_SCALING_COOLDOWN_MS", ""),
        ]))
        .unwrap();

        assert_eq!(config.min_workers, 2);
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.processing_timeout, Duration::from_millis(1500));
        assert_eq!(config.max_messages_per_second, Some(50));
        assert_eq!(config.scaling_cooldown, None);
        assert_eq!(config.scaling_threshold, 100);
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let err = QueueConfig::from_lookup(lookup(&[("PULSE_QUEUE_MAX_WORKERS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("PULSE_QUEUE_MAX_WORKERS"));
    }
}
