//! Collaborator boundaries.
//!
//! The timer knows nothing about sound, windows or storage. Hosts hand it
//! [`PhaseObserver`]s instead; the adapters here turn the raw phase-change
//! stream into calls on a [`SessionRecorder`] or a [`NotificationSink`].

use crate::error::ObserverError;
use crate::events::{PhaseChange, PhaseOutcome};

/// Subscriber to phase changes.
///
/// Called synchronously while the timer is locked, so implementations must
/// be cheap and must not call back into the same timer.
pub trait PhaseObserver: Send {
    fn on_phase_change(&mut self, change: &PhaseChange) -> Result<(), ObserverError>;
}

impl<F> PhaseObserver for F
where
    F: FnMut(&PhaseChange) -> Result<(), ObserverError> + Send,
{
    fn on_phase_change(&mut self, change: &PhaseChange) -> Result<(), ObserverError> {
        self(change)
    }
}

/// Persists session progress. Every hook defaults to a no-op.
pub trait SessionRecorder: Send {
    /// A fresh work phase began.
    fn work_started(&mut self, _change: &PhaseChange) -> Result<(), ObserverError> {
        Ok(())
    }

    /// A work phase ended, either naturally or by skipping.
    /// `change.completed_work_cycles` already counts this phase.
    fn work_finished(
        &mut self,
        _change: &PhaseChange,
        _outcome: &PhaseOutcome,
    ) -> Result<(), ObserverError> {
        Ok(())
    }

    /// A short or long break ended.
    fn break_finished(
        &mut self,
        _change: &PhaseChange,
        _outcome: &PhaseOutcome,
    ) -> Result<(), ObserverError> {
        Ok(())
    }
}

/// UI, sound or desktop notification side effects.
pub trait NotificationSink: Send {
    fn notify(&mut self, change: &PhaseChange) -> Result<(), ObserverError>;
}

/// Routes phase changes to a [`SessionRecorder`].
pub struct RecorderObserver<R> {
    recorder: R,
}

impl<R: SessionRecorder> RecorderObserver<R> {
    pub fn new(recorder: R) -> Self {
        Self { recorder }
    }

    pub fn into_inner(self) -> R {
        self.recorder
    }
}

impl<R: SessionRecorder> PhaseObserver for RecorderObserver<R> {
    fn on_phase_change(&mut self, change: &PhaseChange) -> Result<(), ObserverError> {
        if let Some(outcome) = &change.ended {
            if outcome.phase.is_break() {
                self.recorder.break_finished(change, outcome)?;
            } else {
                self.recorder.work_finished(change, outcome)?;
            }
        }
        if change.starts_work() {
            self.recorder.work_started(change)?;
        }
        Ok(())
    }
}

/// Forwards every phase change to a [`NotificationSink`].
pub struct NotifierObserver<N> {
    sink: N,
}

impl<N: NotificationSink> NotifierObserver<N> {
    pub fn new(sink: N) -> Self {
        Self { sink }
    }
}

impl<N: NotificationSink> PhaseObserver for NotifierObserver<N> {
    fn on_phase_change(&mut self, change: &PhaseChange) -> Result<(), ObserverError> {
        self.sink.notify(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeCause;
    use crate::timer::Phase;
    use chrono::Utc;

    #[derive(Default)]
    struct Tally {
        started: u32,
        work: Vec<(u64, bool, u32)>,
        breaks: Vec<Phase>,
    }

    impl SessionRecorder for Tally {
        fn work_started(&mut self, _change: &PhaseChange) -> Result<(), ObserverError> {
            self.started += 1;
            Ok(())
        }

        fn work_finished(
            &mut self,
            change: &PhaseChange,
            outcome: &PhaseOutcome,
        ) -> Result<(), ObserverError> {
            self.work.push((
                outcome.elapsed_seconds,
                outcome.completed,
                change.completed_work_cycles,
            ));
            Ok(())
        }

        fn break_finished(
            &mut self,
            _change: &PhaseChange,
            outcome: &PhaseOutcome,
        ) -> Result<(), ObserverError> {
            self.breaks.push(outcome.phase);
            Ok(())
        }
    }

    fn change(from: Phase, to: Phase, cause: ChangeCause, ended: Option<PhaseOutcome>) -> PhaseChange {
        PhaseChange {
            from,
            to,
            cause,
            ended,
            completed_work_cycles: 3,
            seconds_left: 0,
            at: Utc::now(),
        }
    }

    #[test]
    fn recorder_sees_work_and_break_endings() {
        let mut observer = RecorderObserver::new(Tally::default());

        let work_done = PhaseOutcome {
            phase: Phase::Work,
            elapsed_seconds: 1500,
            completed: true,
        };
        observer
            .on_phase_change(&change(Phase::Work, Phase::ShortBreak, ChangeCause::Completed, Some(work_done)))
            .unwrap();

        let break_skipped = PhaseOutcome {
            phase: Phase::ShortBreak,
            elapsed_seconds: 10,
            completed: false,
        };
        observer
            .on_phase_change(&change(Phase::ShortBreak, Phase::Work, ChangeCause::Skipped, Some(break_skipped)))
            .unwrap();

        observer
            .on_phase_change(&change(Phase::Work, Phase::Paused, ChangeCause::Paused, None))
            .unwrap();
        observer
            .on_phase_change(&change(Phase::Paused, Phase::Work, ChangeCause::Resumed, None))
            .unwrap();

        let tally = observer.into_inner();
        assert_eq!(tally.work, vec![(1500, true, 3)]);
        assert_eq!(tally.breaks, vec![Phase::ShortBreak]);
        assert_eq!(tally.started, 1);
    }

    #[test]
    fn closures_are_observers() {
        let mut seen = Vec::new();
        {
            let mut observer = |c: &PhaseChange| -> Result<(), ObserverError> {
                seen.push(c.to);
                Ok(())
            };
            observer
                .on_phase_change(&change(Phase::Work, Phase::Paused, ChangeCause::Paused, None))
                .unwrap();
        }
        assert_eq!(seen, vec![Phase::Paused]);
    }
}
