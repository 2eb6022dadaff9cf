use serde::{Deserialize, Serialize};

use super::Phase;
use crate::error::ValidationError;

/// Phase lengths and long-break cadence.
///
/// Immutable once built; every field is guaranteed non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDurations")]
pub struct Durations {
    work_minutes: u32,
    short_break_minutes: u32,
    long_break_minutes: u32,
    long_break_interval: u32,
}

impl Durations {
    /// Build a validated set of durations.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonPositive`] naming the first zero field.
    pub fn new(
        work_minutes: u32,
        short_break_minutes: u32,
        long_break_minutes: u32,
        long_break_interval: u32,
    ) -> Result<Self, ValidationError> {
        let fields = [
            ("work_minutes", work_minutes),
            ("short_break_minutes", short_break_minutes),
            ("long_break_minutes", long_break_minutes),
            ("long_break_interval", long_break_interval),
        ];
        if let Some(&(field, _)) = fields.iter().find(|(_, v)| *v == 0) {
            return Err(ValidationError::NonPositive { field });
        }
        Ok(Self {
            work_minutes,
            short_break_minutes,
            long_break_minutes,
            long_break_interval,
        })
    }

    /// Durations with the default long-break interval of 4.
    pub fn with_default_interval(
        work_minutes: u32,
        short_break_minutes: u32,
        long_break_minutes: u32,
    ) -> Result<Self, ValidationError> {
        Self::new(work_minutes, short_break_minutes, long_break_minutes, 4)
    }

    pub fn work_minutes(&self) -> u32 {
        self.work_minutes
    }

    pub fn short_break_minutes(&self) -> u32 {
        self.short_break_minutes
    }

    pub fn long_break_minutes(&self) -> u32 {
        self.long_break_minutes
    }

    pub fn long_break_interval(&self) -> u32 {
        self.long_break_interval
    }

    /// Nominal length of `phase` in seconds. `Paused` has none.
    pub fn seconds_for(&self, phase: Phase) -> Option<u64> {
        let minutes = match phase {
            Phase::Work => self.work_minutes,
            Phase::ShortBreak => self.short_break_minutes,
            Phase::LongBreak => self.long_break_minutes,
            Phase::Paused => return None,
        };
        Some(u64::from(minutes) * 60)
    }
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            long_break_interval: 4,
        }
    }
}

#[derive(Deserialize)]
struct RawDurations {
    work_minutes: u32,
    short_break_minutes: u32,
    long_break_minutes: u32,
    long_break_interval: u32,
}

impl TryFrom<RawDurations> for Durations {
    type Error = ValidationError;

    fn try_from(raw: RawDurations) -> Result<Self, Self::Error> {
        Durations::new(
            raw.work_minutes,
            raw.short_break_minutes,
            raw.long_break_minutes,
            raw.long_break_interval,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_classic_pomodoro() {
        let d = Durations::default();
        assert_eq!(d.seconds_for(Phase::Work), Some(1500));
        assert_eq!(d.seconds_for(Phase::ShortBreak), Some(300));
        assert_eq!(d.seconds_for(Phase::LongBreak), Some(900));
        assert_eq!(d.long_break_interval(), 4);
    }

    #[test]
    fn paused_has_no_nominal_length() {
        assert_eq!(Durations::default().seconds_for(Phase::Paused), None);
    }

    #[test]
    fn zero_fields_are_rejected() {
        assert_eq!(
            Durations::new(0, 5, 15, 4),
            Err(ValidationError::NonPositive { field: "work_minutes" })
        );
        assert_eq!(
            Durations::new(25, 5, 0, 4),
            Err(ValidationError::NonPositive { field: "long_break_minutes" })
        );
        assert_eq!(
            Durations::new(25, 5, 15, 0),
            Err(ValidationError::NonPositive { field: "long_break_interval" })
        );
    }

    #[test]
    fn deserialize_validates() {
        let bad = r#"{"work_minutes":25,"short_break_minutes":0,"long_break_minutes":15,"long_break_interval":4}"#;
        assert!(serde_json::from_str::<Durations>(bad).is_err());

        let good = r#"{"work_minutes":50,"short_break_minutes":10,"long_break_minutes":30,"long_break_interval":3}"#;
        let d: Durations = serde_json::from_str(good).unwrap();
        assert_eq!(d.work_minutes(), 50);
        assert_eq!(d.long_break_interval(), 3);
    }
}
