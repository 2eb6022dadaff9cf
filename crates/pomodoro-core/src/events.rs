use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Phase, Snapshot};

/// Why the phase changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    /// Countdown reached zero.
    Completed,
    /// The user skipped the rest of the phase.
    Skipped,
    Paused,
    Resumed,
    /// A caller forced a legal transition through `transition_to`.
    Forced,
}

/// The phase that just ended, for session bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseOutcome {
    pub phase: Phase,
    /// Seconds of the phase that actually ran before it ended.
    pub elapsed_seconds: u64,
    /// `true` when the countdown ran out rather than being skipped.
    pub completed: bool,
}

/// Delivered to every observer on each transition, including into and
/// out of `Paused`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseChange {
    pub from: Phase,
    pub to: Phase,
    pub cause: ChangeCause,
    /// Set when a work or break phase finished; `None` for pause/resume.
    pub ended: Option<PhaseOutcome>,
    pub completed_work_cycles: u32,
    pub seconds_left: u64,
    pub at: DateTime<Utc>,
}

impl PhaseChange {
    /// This change starts a fresh work phase.
    pub fn starts_work(&self) -> bool {
        self.to == Phase::Work && self.cause != ChangeCause::Resumed
    }
}

/// Everything the CLI reports is an Event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PhaseChanged(PhaseChange),
    StateSnapshot {
        #[serde(flatten)]
        snapshot: Snapshot,
        nominal_seconds: u64,
        progress: f64,
        running: bool,
        at: DateTime<Utc>,
    },
}
