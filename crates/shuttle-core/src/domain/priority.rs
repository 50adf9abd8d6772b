use serde::{Deserialize, Serialize};
use std::fmt;

/// Dispatch urgency of a queue item.
///
/// Variants are declared lowest first so the derived `Ord` gives
/// `Critical > High > Normal > Low`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background work.
    Low,
    /// Standard instructions.
    #[default]
    Normal,
    /// Important work such as error recovery.
    High,
    /// Must run before anything else that is waiting.
    Critical,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Priority::Critical, Priority::High)]
    #[case(Priority::High, Priority::Normal)]
    #[case(Priority::Normal, Priority::Low)]
    fn ordering_is_by_urgency(#[case] higher: Priority, #[case] lower: Priority) {
        assert!(higher > lower);
    }

    #[test]
    fn default_is_normal() {
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Priority::Critical).unwrap(), "\"critical\"");
        let p: Priority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(p, Priority::Low);
    }
}
