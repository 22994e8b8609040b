//! Fixed-window admission gate for enqueue throughput.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Window {
    max_per_second: Option<u32>,
    admitted: u32,
    started: Instant,
}

/// Caps how many items may be admitted per one-second window.
///
/// Disabled limiters admit everything. Check and increment happen under one
/// lock, so concurrent producers never over-admit.
#[derive(Debug)]
pub struct RateLimiter {
    window: Mutex<Window>,
}

impl RateLimiter {
    /// Create a disabled limiter
    pub fn new() -> Self {
        Self {
            window: Mutex::new(Window {
                max_per_second: None,
                admitted: 0,
                started: Instant::now(),
            }),
        }
    }

    /// Create a limiter that is already enabled
    pub fn with_limit(max_per_second: u32) -> Self {
        let limiter = Self::new();
        limiter.enable(max_per_second);
        limiter
    }

    /// Enable limiting, starting a fresh window
    pub fn enable(&self, max_per_second: u32) {
        let mut window = self.window.lock();
        window.max_per_second = Some(max_per_second);
        window.admitted = 0;
        window.started = Instant::now();
    }

    /// Disable limiting
    pub fn disable(&self) {
        self.window.lock().max_per_second = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.window.lock().max_per_second.is_some()
    }

    /// Configured cap, if enabled
    pub fn limit(&self) -> Option<u32> {
        self.window.lock().max_per_second
    }

    /// Decide whether one more item may enter the queue
    pub fn admit(&self) -> bool {
        let mut window = self.window.lock();
        let Some(max) = window.max_per_second else {
            return true;
        };

        let now = Instant::now();
        if now.duration_since(window.started) >= WINDOW {
            window.admitted = 0;
            window.started = now;
        }

        if window.admitted < max {
            window.admitted += 1;
            true
        } else {
            false
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_limiter_admits_everything() {
        let limiter = RateLimiter::new();
        assert!(!limiter.is_enabled());
        assert!((0..10_000).all(|_| limiter.admit()));
    }

    #[tokio::test(start_paused = true)]
    async fn caps_admissions_within_a_window() {
        let limiter = RateLimiter::with_limit(2);

        let admitted = (0..5).filter(|_| limiter.admit()).count();
        assert_eq!(admitted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_one_second() {
        let limiter = RateLimiter::with_limit(1);
        assert!(limiter.admit());
        assert!(!limiter.admit());

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(!limiter.admit());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(limiter.admit());
        assert!(!limiter.admit());
    }

    #[tokio::test(start_paused = true)]
    async fn disable_and_reenable() {
        let limiter = RateLimiter::with_limit(1);
        assert!(limiter.admit());
        assert!(!limiter.admit());

        limiter.disable();
        assert!(limiter.admit());
        assert_eq!(limiter.limit(), None);

        limiter.enable(3);
        assert_eq!(limiter.limit(), Some(3));
        assert_eq!((0..5).filter(|_| limiter.admit()).count(), 3);
    }

    #[test]
    fn zero_limit_rejects_everything() {
        let limiter = RateLimiter::with_limit(0);
        assert!(!limiter.admit());
    }
}
