//! Phase state machine.
//!
//! `TimerState` is a pure, synchronous state holder: it never reads the
//! clock or spawns threads. Callers drive it with `tick()` (pull mode) or
//! hand it to a [`Ticker`](super::Ticker) (push mode).
//!
//! ## State Transitions
//!
//! ```text
//! Work -> ShortBreak | LongBreak -> Work
//!   any of the above <-> Paused
//! ```
//!
//! After every `long_break_interval` completed work phases the break is a
//! long one; otherwise it is short.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Durations, Phase};
use crate::error::{TimerError, TransitionError, ValidationError};
use crate::events::{ChangeCause, PhaseChange, PhaseOutcome};
use crate::observer::PhaseObserver;

/// Persisted shape of a [`TimerState`], sufficient to rebuild it exactly,
/// including mid-pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub seconds_left: u64,
    pub completed_work_cycles: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended_phase: Option<Phase>,
}

/// The mutable timer aggregate.
pub struct TimerState {
    durations: Durations,
    phase: Phase,
    seconds_left: u64,
    completed_work_cycles: u32,
    /// Set only while `phase == Paused`.
    suspended_phase: Option<Phase>,
    observers: Vec<Box<dyn PhaseObserver>>,
}

impl TimerState {
    /// Fresh timer at the start of a work phase.
    pub fn new(durations: Durations) -> Self {
        Self {
            durations,
            phase: Phase::Work,
            seconds_left: nominal(&durations, Phase::Work),
            completed_work_cycles: 0,
            suspended_phase: None,
            observers: Vec::new(),
        }
    }

    /// Rebuild a timer from a persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InconsistentSnapshot`] when `phase` and
    /// `suspended_phase` disagree about whether the timer is paused.
    pub fn restore(durations: Durations, snapshot: Snapshot) -> Result<Self, ValidationError> {
        match (snapshot.phase, snapshot.suspended_phase) {
            (Phase::Paused, None) => {
                return Err(ValidationError::InconsistentSnapshot(
                    "paused without a suspended phase".into(),
                ))
            }
            (Phase::Paused, Some(Phase::Paused)) => {
                return Err(ValidationError::InconsistentSnapshot(
                    "suspended phase cannot be paused".into(),
                ))
            }
            (phase, Some(_)) if phase != Phase::Paused => {
                return Err(ValidationError::InconsistentSnapshot(format!(
                    "suspended phase set while {phase}"
                )))
            }
            _ => {}
        }
        Ok(Self {
            durations,
            phase: snapshot.phase,
            seconds_left: snapshot.seconds_left,
            completed_work_cycles: snapshot.completed_work_cycles,
            suspended_phase: snapshot.suspended_phase,
            observers: Vec::new(),
        })
    }

    /// Register an observer. Observers run in registration order.
    pub fn subscribe(&mut self, observer: impl PhaseObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn with_observer(mut self, observer: impl PhaseObserver + 'static) -> Self {
        self.subscribe(observer);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The phase being timed, looking through `Paused`.
    pub fn logical_phase(&self) -> Phase {
        self.suspended_phase.unwrap_or(self.phase)
    }

    pub fn suspended_phase(&self) -> Option<Phase> {
        self.suspended_phase
    }

    pub fn seconds_left(&self) -> u64 {
        self.seconds_left
    }

    pub fn completed_work_cycles(&self) -> u32 {
        self.completed_work_cycles
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    pub fn durations(&self) -> &Durations {
        &self.durations
    }

    /// Nominal length of the logical phase in seconds.
    pub fn nominal_seconds(&self) -> u64 {
        nominal(&self.durations, self.logical_phase())
    }

    /// 0.0 .. 1.0 progress within the logical phase.
    pub fn progress(&self) -> f64 {
        let total = self.nominal_seconds();
        if total == 0 {
            return 0.0;
        }
        (1.0 - self.seconds_left as f64 / total as f64).clamp(0.0, 1.0)
    }

    /// The phase the machine moves to when the logical phase ends.
    pub fn next_phase(&self) -> Phase {
        self.successor(self.logical_phase())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            seconds_left: self.seconds_left,
            completed_work_cycles: self.completed_work_cycles,
            suspended_phase: self.suspended_phase,
        }
    }

    /// Whether `transition_to(target)` would be accepted.
    pub fn allows(&self, target: Phase) -> bool {
        match (self.phase, target) {
            (Phase::Paused, Phase::Paused) => false,
            (Phase::Paused, t) => Some(t) == self.suspended_phase || t == self.next_phase(),
            (_, Phase::Paused) => true,
            (current, t) => t == self.successor(current),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Count down by `delta_seconds`. Returns `true` when the phase ended
    /// during this call. Leftover time is not carried into the next phase.
    ///
    /// # Errors
    ///
    /// Only observer failures; the transition itself is already applied.
    pub fn tick(&mut self, delta_seconds: u64) -> Result<bool, TimerError> {
        if self.is_paused() {
            return Ok(false);
        }
        self.seconds_left = self.seconds_left.saturating_sub(delta_seconds);
        if self.seconds_left > 0 {
            return Ok(false);
        }
        self.finish_phase(ChangeCause::Completed)?;
        Ok(true)
    }

    /// Skip the rest of the logical phase.
    ///
    /// While paused this also leaves `Paused`: the machine lands in the
    /// successor of the suspended phase.
    pub fn advance(&mut self) -> Result<(), TimerError> {
        self.finish_phase(ChangeCause::Skipped)
    }

    pub fn pause(&mut self) -> Result<(), TimerError> {
        if self.is_paused() {
            return Ok(());
        }
        let from = self.phase;
        self.suspended_phase = Some(from);
        self.phase = Phase::Paused;
        self.notify(from, ChangeCause::Paused, None)
    }

    pub fn resume(&mut self) -> Result<(), TimerError> {
        let Some(suspended) = self.suspended_phase.take() else {
            return Ok(());
        };
        self.phase = suspended;
        self.notify(Phase::Paused, ChangeCause::Resumed, None)
    }

    /// Restart the countdown of the current (or suspended) phase.
    /// Not a transition; observers are not notified.
    pub fn reset_current_phase(&mut self) {
        self.seconds_left = self.nominal_seconds();
        debug!(phase = %self.logical_phase(), seconds_left = self.seconds_left, "phase reset");
    }

    /// Force a specific phase.
    ///
    /// # Errors
    ///
    /// [`TimerError::Transition`] if `target` is not reachable from the
    /// current phase in one legal step.
    pub fn transition_to(&mut self, target: Phase) -> Result<(), TimerError> {
        if !self.allows(target) {
            return Err(TransitionError {
                from: self.phase,
                to: target,
            }
            .into());
        }
        match target {
            Phase::Paused => self.pause(),
            t if Some(t) == self.suspended_phase => self.resume(),
            _ => self.finish_phase(ChangeCause::Forced),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn successor(&self, phase: Phase) -> Phase {
        match phase {
            Phase::Work => {
                let cycles = self.completed_work_cycles.saturating_add(1);
                if cycles % self.durations.long_break_interval() == 0 {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                }
            }
            Phase::ShortBreak | Phase::LongBreak => Phase::Work,
            // A bare Paused has nothing to resume into.
            Phase::Paused => Phase::Work,
        }
    }

    fn finish_phase(&mut self, cause: ChangeCause) -> Result<(), TimerError> {
        let from = self.phase;
        let ended = self.logical_phase();
        let next = self.successor(ended);
        let outcome = PhaseOutcome {
            phase: ended,
            elapsed_seconds: self.nominal_seconds().saturating_sub(self.seconds_left),
            completed: cause == ChangeCause::Completed,
        };

        if ended == Phase::Work {
            self.completed_work_cycles = self.completed_work_cycles.saturating_add(1);
        }
        self.suspended_phase = None;
        self.phase = next;
        self.seconds_left = nominal(&self.durations, next);

        self.notify(from, cause, Some(outcome))
    }

    fn notify(
        &mut self,
        from: Phase,
        cause: ChangeCause,
        ended: Option<PhaseOutcome>,
    ) -> Result<(), TimerError> {
        let change = PhaseChange {
            from,
            to: self.phase,
            cause,
            ended,
            completed_work_cycles: self.completed_work_cycles,
            seconds_left: self.seconds_left,
            at: Utc::now(),
        };
        debug!(
            from = %change.from,
            to = %change.to,
            cause = ?change.cause,
            cycles = change.completed_work_cycles,
            "phase changed"
        );
        for observer in &mut self.observers {
            observer
                .on_phase_change(&change)
                .map_err(TimerError::Observer)?;
        }
        Ok(())
    }
}

fn nominal(durations: &Durations, phase: Phase) -> u64 {
    durations.seconds_for(phase).unwrap_or(0)
}

impl fmt::Debug for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerState")
            .field("durations", &self.durations)
            .field("phase", &self.phase)
            .field("seconds_left", &self.seconds_left)
            .field("completed_work_cycles", &self.completed_work_cycles)
            .field("suspended_phase", &self.suspended_phase)
            .field("observers", &self.observers.len())
            .finish()
    }
}
