use serde::{Deserialize, Serialize};

/// Priority levels for queue ordering (Higher values = dequeued first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority messages (processed last)
    Low = 1,

    /// Normal priority messages (default)
    Normal = 2,

    /// High priority messages
    High = 3,

    /// Critical priority messages (processed before everything else)
    Critical = 4,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl Priority {
    /// Get all priority levels in order (low to high)
    pub fn all() -> &'static [Priority] {
        &[Self::Low, Self::Normal, Self::High, Self::Critical]
    }

    /// Dequeue scan order: critical first, low last
    pub fn descending() -> &'static [Priority] {
        &[Self::Critical, Self::High, Self::Normal, Self::Low]
    }

    /// Get the numeric value for ordering
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Zero-based slot used by backends that keep one FIFO per level
    pub fn index(self) -> usize {
        (self as usize) - 1
    }

    /// Create from numeric value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Low),
            2 => Some(Self::Normal),
            3 => Some(Self::High),
            4 => Some(Self::Critical),
            _ => None,
        }
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_dequeue_precedence() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);

        let mut scan = Priority::all().to_vec();
        scan.reverse();
        assert_eq!(scan, Priority::descending());
    }

    #[test]
    fn index_and_from_u8() {
        for (slot, priority) in Priority::all().iter().enumerate() {
            assert_eq!(priority.index(), slot);
            assert_eq!(Priority::from_u8(priority.as_u8()), Some(*priority));
        }
        assert_eq!(Priority::from_u8(9), None);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("CRITICAL".parse::<Priority>(), Ok(Priority::Critical));
        assert_eq!(" low ".parse::<Priority>(), Ok(Priority::Low));
        assert!("urgent".parse::<Priority>().is_err());
    }
}
