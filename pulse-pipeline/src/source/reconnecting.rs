use async_trait::async_trait;
use tracing::{info, warn};

use super::{BackoffConfig, ExponentialBackoff, MessageSource};
use crate::{error::SourceError, message::ChatMessage};

/// Wraps a source and transparently reconnects on transient errors.
///
/// Gives up with [`SourceError::RetriesExhausted`] after `max_attempts`
/// consecutive failed reconnects. The backoff resets after every message
/// read successfully.
pub struct ReconnectingSource<S> {
    inner: S,
    backoff: ExponentialBackoff,
    max_attempts: u32,
}

impl<S: MessageSource> ReconnectingSource<S> {
    pub fn new(inner: S, backoff: BackoffConfig, max_attempts: u32) -> Self {
        Self {
            inner,
            backoff: ExponentialBackoff::new(backoff),
            max_attempts,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    async fn reconnect(&mut self, cause: SourceError) -> Result<(), SourceError> {
        let mut last_error = cause.to_string();

        loop {
            if self.backoff.attempt() >= self.max_attempts {
                return Err(SourceError::RetriesExhausted {
                    attempts: self.backoff.attempt(),
                    last_error,
                });
            }

            let delay = self.backoff.next_delay();
            warn!(
                source = self.inner.name(),
                attempt = self.backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "source unavailable, reconnecting"
            );
            tokio::time::sleep(delay).await;

            match self.inner.connect().await {
                Ok(()) => {
                    info!(source = self.inner.name(), attempt = self.backoff.attempt(), "source reconnected");
                    return Ok(());
                }
                Err(e) if e.is_transient() => last_error = e.to_string(),
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<S: MessageSource> MessageSource for ReconnectingSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn connect(&mut self) -> Result<(), SourceError> {
        match self.inner.connect().await {
            Ok(()) => Ok(()),
            Err(e) if e.is_transient() => self.reconnect(e).await,
            Err(e) => Err(e),
        }
    }

    async fn next_message(&mut self) -> Result<Option<ChatMessage>, SourceError> {
        loop {
            match self.inner.next_message().await {
                Ok(message) => {
                    self.backoff.reset();
                    return Ok(message);
                }
                Err(e) if e.is_transient() => self.reconnect(e).await?,
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Platform;
    use crate::source::SimulatedSource;
    use std::time::Duration;

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    /// Refuses the first `failures` connects, then serves one message
    struct Flaky {
        failures: u32,
        served: bool,
    }

    #[async_trait]
    impl MessageSource for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn connect(&mut self) -> Result<(), SourceError> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(SourceError::Connection("refused".to_string()));
            }
            Ok(())
        }

        async fn next_message(&mut self) -> Result<Option<ChatMessage>, SourceError> {
            if self.served {
                return Ok(None);
            }
            self.served = true;
            Ok(Some(ChatMessage::new(Platform::Discord, "scrims", "bot", "ready")))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn survives_scheduled_disconnects() {
        let inner = SimulatedSource::new("lec", 11).with_count(6).with_disconnect_every(2);
        let mut source = ReconnectingSource::new(inner, fast_backoff(), 3);
        source.connect().await.unwrap();

        let mut received = 0;
        while source.next_message().await.unwrap().is_some() {
            received += 1;
        }
        assert_eq!(received, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_retries_until_the_source_accepts() {
        let mut source = ReconnectingSource::new(Flaky { failures: 2, served: false }, fast_backoff(), 3);
        source.connect().await.unwrap();
        assert!(source.next_message().await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let mut source = ReconnectingSource::new(Flaky { failures: 10, served: false }, fast_backoff(), 3);
        match source.connect().await {
            Err(SourceError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected retries to run out, got {other:?}"),
        }
    }
}
