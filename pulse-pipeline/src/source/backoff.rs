//! Exponential reconnect delays with jitter

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Random spread applied to each delay, 0.0 to 1.0
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Stateful delay calculator; `reset` after a healthy read
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Delay for the next attempt, advancing the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let exponent = i32::try_from(self.attempt).unwrap_or(i32::MAX);
        self.attempt = self.attempt.saturating_add(1);

        let max_ms = self.config.max_delay.as_secs_f64() * 1000.0;
        let base_ms = self.config.initial_delay.as_secs_f64() * 1000.0 * self.config.multiplier.powi(exponent);
        let capped_ms = base_ms.min(max_ms);

        let delay_ms = if self.config.jitter_factor > 0.0 {
            let spread = capped_ms * self.config.jitter_factor.min(1.0);
            let jitter = rand::thread_rng().gen_range(-spread..=spread);
            (capped_ms + jitter).clamp(1.0, max_ms.max(1.0))
        } else {
            capped_ms.max(1.0)
        };

        Duration::from_millis(delay_ms as u64)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Delays handed out since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter(initial_ms: u64, max_ms: u64) -> ExponentialBackoff {
        ExponentialBackoff::new(BackoffConfig {
            initial_delay: Duration::from_millis(initial_ms),
            max_delay: Duration::from_millis(max_ms),
            multiplier: 2.0,
            jitter_factor: 0.0,
        })
    }

    #[test]
    fn delays_double_from_the_initial_value() {
        let mut backoff = no_jitter(100, 10_000);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.attempt(), 3);
    }

    #[test]
    fn delays_are_capped() {
        let mut backoff = no_jitter(1_000, 3_000);
        for _ in 0..10 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::from_millis(3_000));
    }

    #[test]
    fn reset_starts_over() {
        let mut backoff = no_jitter(50, 1_000);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(50));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let mut backoff = ExponentialBackoff::new(BackoffConfig {
            initial_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_secs(60),
            multiplier: 1.0,
            jitter_factor: 0.2,
        });
        for _ in 0..50 {
            let delay = backoff.next_delay().as_millis();
            assert!((800..=1_200).contains(&delay), "delay {delay} out of range");
        }
    }
}
