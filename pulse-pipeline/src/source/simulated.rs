use std::time::Duration;

use async_trait::async_trait;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use tracing::debug;

use super::MessageSource;
use crate::{
    error::SourceError,
    message::{ChatMessage, Platform},
};

const HANDLES: &[&str] = &["faker_fan", "baronsteal", "wardbot", "midgap", "jgdiff", "copium", "tiltproof"];

const LINES: &[&str] = &[
    "what a play",
    "gg",
    "POGGERS that teamfight",
    "this draft is so boring",
    "clutch baron steal, insane",
    "lag again??",
    "support diff honestly",
    "LUL",
    "hype hype hype",
    "worst throw of the season",
    "that ult was clean",
    "noob mistake from top",
];

const ALERT_LINES: &[&str] = &["they are using a wallhack", "someone threatened to ddos the venue"];

/// Reproducible generator of chat traffic.
///
/// The same seed always yields the same authors, texts and badges.
pub struct SimulatedSource {
    channel: String,
    rng: StdRng,
    remaining: Option<usize>,
    interval: Duration,
    disconnect_every: Option<usize>,
    since_connect: usize,
    connected: bool,
}

impl SimulatedSource {
    pub fn new(channel: impl Into<String>, seed: u64) -> Self {
        Self {
            channel: channel.into(),
            rng: StdRng::seed_from_u64(seed),
            remaining: None,
            interval: Duration::ZERO,
            disconnect_every: None,
            since_connect: 0,
            connected: false,
        }
    }

    /// Stop after `count` messages instead of running forever
    pub fn with_count(mut self, count: usize) -> Self {
        self.remaining = Some(count);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Drop the connection after every `n` messages
    pub fn with_disconnect_every(mut self, n: usize) -> Self {
        self.disconnect_every = (n > 0).then_some(n);
        self
    }

    fn generate(&mut self) -> ChatMessage {
        let handle = HANDLES.choose(&mut self.rng).copied().unwrap_or("viewer");
        let author = format!("{}{}", handle, self.rng.gen_range(1..1000));

        let text = if self.rng.gen_bool(0.03) {
            ALERT_LINES.choose(&mut self.rng).copied().unwrap_or("cheat")
        } else {
            LINES.choose(&mut self.rng).copied().unwrap_or("gg")
        };

        let message = ChatMessage::new(Platform::Simulated, self.channel.clone(), author, text);
        if self.rng.gen_bool(0.05) {
            message.with_badge("moderator")
        } else {
            message
        }
    }
}

#[async_trait]
impl MessageSource for SimulatedSource {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn connect(&mut self) -> Result<(), SourceError> {
        debug!(channel = %self.channel, "simulated source connected");
        self.connected = true;
        self.since_connect = 0;
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<ChatMessage>, SourceError> {
        if !self.connected {
            return Err(SourceError::Connection("simulated source is not connected".to_string()));
        }
        if self.remaining == Some(0) {
            return Ok(None);
        }

        if let Some(every) = self.disconnect_every {
            if self.since_connect >= every {
                self.connected = false;
                return Err(SourceError::Disconnected(format!("dropped after {} messages", every)));
            }
        }

        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }

        let message = self.generate();
        self.since_connect += 1;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Ok(Some(message))
    }
}
