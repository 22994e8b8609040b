use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pulse_queue::Priority;
use serde::{Deserialize, Serialize};

use crate::{
    analyzer::{Analysis, SentimentLabel},
    message::ChatMessage,
};

/// An analyzed message as kept by the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub message: ChatMessage,
    pub analysis: Analysis,
    pub priority: Priority,
    pub analyzed_at: DateTime<Utc>,
}

/// Running aggregates over everything ever recorded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_analyzed: u64,
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
    pub mean_sentiment: f64,
    pub flagged_toxic: u64,
    pub toxicity_threshold: f32,
}

#[derive(Default)]
struct Inner {
    recent: VecDeque<StoredAnalysis>,
    total: u64,
    positive: u64,
    neutral: u64,
    negative: u64,
    sentiment_sum: f64,
    flagged: u64,
}

/// Bounded window of recent results plus unbounded aggregates
pub struct AnalysisStore {
    capacity: usize,
    toxicity_threshold: f32,
    inner: Mutex<Inner>,
}

impl AnalysisStore {
    pub fn new(capacity: usize, toxicity_threshold: f32) -> Self {
        Self {
            capacity,
            toxicity_threshold,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Store a result; returns whether it crossed the toxicity threshold
    pub fn record(&self, message: ChatMessage, analysis: Analysis, priority: Priority) -> bool {
        let flagged = analysis.toxicity >= self.toxicity_threshold;
        let mut inner = self.inner.lock();

        inner.total += 1;
        inner.sentiment_sum += f64::from(analysis.sentiment);
        match analysis.label {
            SentimentLabel::Positive => inner.positive += 1,
            SentimentLabel::Neutral => inner.neutral += 1,
            SentimentLabel::Negative => inner.negative += 1,
        }
        if flagged {
            inner.flagged += 1;
        }

        if self.capacity > 0 {
            if inner.recent.len() >= self.capacity {
                inner.recent.pop_front();
            }
            inner.recent.push_back(StoredAnalysis {
                message,
                analysis,
                priority,
                analyzed_at: Utc::now(),
            });
        }
        flagged
    }

    /// Up to `n` most recent results, newest first
    pub fn recent(&self, n: usize) -> Vec<StoredAnalysis> {
        self.inner.lock().recent.iter().rev().take(n).cloned().collect()
    }

    /// Recent results at or above the toxicity threshold, newest first
    pub fn flagged(&self, n: usize) -> Vec<StoredAnalysis> {
        self.inner
            .lock()
            .recent
            .iter()
            .rev()
            .filter(|stored| stored.analysis.toxicity >= self.toxicity_threshold)
            .take(n)
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> AnalysisSummary {
        let inner = self.inner.lock();
        AnalysisSummary {
            total_analyzed: inner.total,
            positive: inner.positive,
            neutral: inner.neutral,
            negative: inner.negative,
            mean_sentiment: if inner.total == 0 {
                0.0
            } else {
                inner.sentiment_sum / inner.total as f64
            },
            flagged_toxic: inner.flagged,
            toxicity_threshold: self.toxicity_threshold,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Platform;

    fn result(text: &str, sentiment: f32, toxicity: f32) -> (ChatMessage, Analysis) {
        let message = ChatMessage::new(Platform::Twitch, "msi", "v", text);
        let analysis = Analysis {
            message_id: message.id.clone(),
            sentiment,
            toxicity,
            label: SentimentLabel::from_score(sentiment),
        };
        (message, analysis)
    }

    #[test]
    fn window_is_bounded_but_aggregates_are_not() {
        let store = AnalysisStore::new(2, 0.5);
        for (i, sentiment) in [1.0, -1.0, 0.0].into_iter().enumerate() {
            let (message, analysis) = result(&format!("line {i}"), sentiment, 0.0);
            store.record(message, analysis, Priority::Normal);
        }

        assert_eq!(store.len(), 2);
        let recent = store.recent(10);
        assert_eq!(recent[0].message.text, "line 2");
        assert_eq!(recent[1].message.text, "line 1");

        let summary = store.summary();
        assert_eq!(summary.total_analyzed, 3);
        assert_eq!((summary.positive, summary.neutral, summary.negative), (1, 1, 1));
        assert_eq!(summary.mean_sentiment, 0.0);
    }

    #[test]
    fn toxic_results_are_flagged() {
        let store = AnalysisStore::new(10, 0.5);
        let (message, analysis) = result("noob", -1.0, 0.5);
        assert!(store.record(message, analysis, Priority::Normal));
        let (message, analysis) = result("fine", 0.0, 0.1);
        assert!(!store.record(message, analysis, Priority::Low));

        assert_eq!(store.summary().flagged_toxic, 1);
        assert_eq!(store.flagged(5).len(), 1);
    }

    #[test]
    fn empty_store_summary() {
        let summary = AnalysisStore::new(10, 0.5).summary();
        assert_eq!(summary.total_analyzed, 0);
        assert_eq!(summary.mean_sentiment, 0.0);
    }
}
