//! Sentiment and toxicity scoring contract.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::ChatMessage;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    /// Worth retrying, e.g. a model backend hiccup
    #[error("Analyzer unavailable: {0}")]
    Transient(String),

    /// The message itself cannot be analyzed
    #[error("Message cannot be analyzed: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Bucket a score in `-1.0..=1.0`
    pub fn from_score(score: f32) -> Self {
        if score > 0.25 {
            Self::Positive
        } else if score < -0.25 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub message_id: String,
    /// -1.0 (hostile) to 1.0 (hyped)
    pub sentiment: f32,
    /// 0.0 to 1.0
    pub toxicity: f32,
    pub label: SentimentLabel,
}

/// Model inference seam; implementations are called from many workers at once
#[async_trait]
pub trait Analyzer: Send + Sync + 'static {
    async fn analyze(&self, message: &ChatMessage) -> Result<Analysis, AnalyzerError>;
}

const POSITIVE: &[&str] = &[
    "gg", "pog", "poggers", "hype", "clean", "insane", "clutch", "great", "love", "nice", "wp", "goat",
];
const NEGATIVE: &[&str] = &["boring", "lag", "throw", "worst", "bad", "diff", "cringe", "copium", "sad"];
const TOXIC: &[&str] = &["noob", "trash", "idiot", "stupid", "loser", "uninstall", "kys"];

/// Word-list scorer for chat slang
#[derive(Debug, Clone)]
pub struct LexiconAnalyzer {
    positive: HashSet<String>,
    negative: HashSet<String>,
    toxic: HashSet<String>,
}

impl Default for LexiconAnalyzer {
    fn default() -> Self {
        let set = |words: &[&str]| -> HashSet<String> { words.iter().map(|w| w.to_string()).collect() };
        Self {
            positive: set(POSITIVE),
            negative: set(NEGATIVE),
            toxic: set(TOXIC),
        }
    }
}

impl LexiconAnalyzer {
    pub fn score(&self, message: &ChatMessage) -> Result<Analysis, AnalyzerError> {
        let text = message.text.to_lowercase();
        let tokens: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.is_empty() {
            return Err(AnalyzerError::Invalid("no words to score".to_string()));
        }

        let positive = tokens.iter().filter(|t| self.positive.contains(**t)).count() as f32;
        let negative = tokens.iter().filter(|t| self.negative.contains(**t)).count() as f32;
        let toxic = tokens.iter().filter(|t| self.toxic.contains(**t)).count() as f32;

        // Toxic words also pull sentiment down
        let against = negative + toxic;
        let sentiment = if positive + against > 0.0 {
            (positive - against) / (positive + against)
        } else {
            0.0
        };
        let toxicity = (toxic * 0.5).min(1.0);

        Ok(Analysis {
            message_id: message.id.clone(),
            sentiment,
            toxicity,
            label: SentimentLabel::from_score(sentiment),
        })
    }
}

#[async_trait]
impl Analyzer for LexiconAnalyzer {
    async fn analyze(&self, message: &ChatMessage) -> Result<Analysis, AnalyzerError> {
        self.score(message)
    }
}
