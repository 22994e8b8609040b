//! Chat records flowing through the pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a chat line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitch,
    Discord,
    #[serde(rename = "youtube")]
    YouTube,
    Simulated,
    /// Replayed from a file; records without a platform land here
    #[default]
    Upload,
}

impl Platform {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Twitch => "twitch",
            Self::Discord => "discord",
            Self::YouTube => "youtube",
            Self::Simulated => "simulated",
            Self::Upload => "upload",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// One chat line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default = "generate_id")]
    pub id: String,
    #[serde(default)]
    pub platform: Platform,
    pub channel: String,
    pub author: String,
    pub text: String,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub badges: Vec<String>,
}

impl ChatMessage {
    pub fn new(
        platform: Platform,
        channel: impl Into<String>,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_id(),
            platform,
            channel: channel.into(),
            author: author.into(),
            text: text.into(),
            received_at: Utc::now(),
            badges: Vec::new(),
        }
    }

    pub fn with_badge(mut self, badge: impl Into<String>) -> Self {
        self.badges.push(badge.into());
        self
    }

    /// Moderators and the channel owner
    pub fn is_moderator(&self) -> bool {
        self.badges
            .iter()
            .any(|badge| badge.eq_ignore_ascii_case("moderator") || badge.eq_ignore_ascii_case("broadcaster"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_record_gets_defaults() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"channel":"lec","author":"fan42","text":"what a play"}"#).unwrap();

        assert_eq!(msg.platform, Platform::Upload);
        assert!(!msg.id.is_empty());
        assert!(msg.badges.is_empty());
    }

    #[test]
    fn platform_names_round_trip_through_serde() {
        let json = serde_json::to_string(&Platform::YouTube).unwrap();
        assert_eq!(json, "\"youtube\"");
        assert_eq!(Platform::YouTube.to_string(), "youtube");
    }

    #[test]
    fn broadcaster_counts_as_moderator() {
        let msg = ChatMessage::new(Platform::Twitch, "lck", "caster", "welcome").with_badge("Broadcaster");
        assert!(msg.is_moderator());
        assert!(!ChatMessage::new(Platform::Twitch, "lck", "viewer", "hi").is_moderator());
    }
}
