use pulse_queue::Priority;

use crate::message::ChatMessage;

/// Keywords that flag a message for immediate moderation review
pub const DEFAULT_ALERT_KEYWORDS: &[&str] = &["cheat", "hack", "ddos", "dox", "threat"];

/// Maps chat lines onto queue priorities.
///
/// Rules apply in order: alert keyword, moderator badge, short text.
#[derive(Debug, Clone)]
pub struct PriorityRules {
    alert_keywords: Vec<String>,
    low_max_len: usize,
}

impl Default for PriorityRules {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_KEYWORDS.iter().map(|k| k.to_string()), 4)
    }
}

impl PriorityRules {
    /// `low_max_len`: texts with fewer characters than this go to `Low`
    pub fn new<I>(alert_keywords: I, low_max_len: usize) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            alert_keywords: alert_keywords
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            low_max_len,
        }
    }

    pub fn classify(&self, message: &ChatMessage) -> Priority {
        let text = message.text.to_lowercase();

        if self.alert_keywords.iter().any(|keyword| text.contains(keyword.as_str())) {
            Priority::Critical
        } else if message.is_moderator() {
            Priority::High
        } else if message.text.trim().chars().count() < self.low_max_len {
            Priority::Low
        } else {
            Priority::Normal
        }
    }

    pub fn alert_keywords(&self) -> &[String] {
        &self.alert_keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Platform;

    fn msg(text: &str) -> ChatMessage {
        ChatMessage::new(Platform::Twitch, "worlds", "viewer", text)
    }

    #[test]
    fn alert_keywords_win_over_everything() {
        let rules = PriorityRules::default();
        let from_mod = msg("someone is using a HACK").with_badge("moderator");
        assert_eq!(rules.classify(&from_mod), Priority::Critical);
    }

    #[test]
    fn moderators_are_high() {
        let rules = PriorityRules::default();
        assert_eq!(rules.classify(&msg("slow mode on").with_badge("moderator")), Priority::High);
    }

    #[test]
    fn short_lines_are_low_and_the_rest_normal() {
        let rules = PriorityRules::default();
        assert_eq!(rules.classify(&msg("gg")), Priority::Low);
        assert_eq!(rules.classify(&msg("that baron steal was insane")), Priority::Normal);
    }

    #[test]
    fn keywords_are_normalized() {
        let rules = PriorityRules::new(vec!["  Smurf ".to_string(), String::new()], 2);
        assert_eq!(rules.alert_keywords(), &["smurf".to_string()]);
        assert_eq!(rules.classify(&msg("total smurf account")), Priority::Critical);
    }
}
