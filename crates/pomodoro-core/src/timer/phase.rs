use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic mode of the timer.
///
/// `Paused` is a meta-state with no duration of its own; the interrupted
/// phase is kept alongside it by [`TimerState`](super::TimerState).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
    Paused,
}

impl Phase {
    pub fn is_break(self) -> bool {
        matches!(self, Phase::ShortBreak | Phase::LongBreak)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::ShortBreak => "short_break",
            Phase::LongBreak => "long_break",
            Phase::Paused => "paused",
        }
    }

    /// Human-readable label for notifications.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Work => "Focus",
            Phase::ShortBreak => "Short Break",
            Phase::LongBreak => "Long Break",
            Phase::Paused => "Paused",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&Phase::ShortBreak).unwrap();
        assert_eq!(json, "\"short_break\"");
        let parsed: Phase = serde_json::from_str("\"long_break\"").unwrap();
        assert_eq!(parsed, Phase::LongBreak);
    }

    #[test]
    fn only_short_and_long_are_breaks() {
        assert!(Phase::ShortBreak.is_break());
        assert!(Phase::LongBreak.is_break());
        assert!(!Phase::Work.is_break());
        assert!(!Phase::Paused.is_break());
    }
}
