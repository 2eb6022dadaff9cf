//! # Pomodoro Core Library
//!
//! Session timer engine for a Pomodoro timer: alternating work and break
//! phases, with a long break after every N completed work phases.
//!
//! ## Architecture
//!
//! - **Timer**: [`TimerState`] is a synchronous phase state machine. Hosts
//!   either call `tick(elapsed)` from their own loop (pull mode) or hand it
//!   to a [`Ticker`] that ticks from a background task (push mode).
//! - **Observers**: every transition is delivered to the registered
//!   [`PhaseObserver`]s in order; [`SessionRecorder`] and
//!   [`NotificationSink`] are the collaborator seams built on top.
//! - **Storage**: SQLite phase history and statistics, TOML configuration.

pub mod error;
pub mod events;
pub mod observer;
pub mod storage;
pub mod timer;

pub use error::{
    ConfigError, CoreError, DatabaseError, ObserverError, TimerError, TransitionError,
    ValidationError,
};
pub use events::{ChangeCause, Event, PhaseChange, PhaseOutcome};
pub use observer::{
    NotificationSink, NotifierObserver, PhaseObserver, RecorderObserver, SessionRecorder,
};
pub use storage::{Config, Database, Stats};
pub use timer::{Durations, Phase, SharedTimer, Snapshot, Ticker, TimerState};
