use std::error::Error;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;
use pomodoro_core::{
    ChangeCause, Config, Database, Event, NotificationSink, NotifierObserver, ObserverError,
    Phase, PhaseChange, RecorderObserver, SharedTimer, Snapshot, Ticker, TimerError, TimerState,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

const TIMER_KEY: &str = "timer_session";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start counting down (also resumes a paused timer)
    Start,
    /// Stop counting without changing the phase
    Stop,
    /// Pause the current phase
    Pause,
    /// Resume a paused phase
    Resume,
    /// Skip the rest of the current phase
    Skip,
    /// Discard the session and start over with a fresh work phase
    Reset,
    /// Restart the countdown of the current phase
    ResetPhase,
    /// Print current timer state as JSON
    Status,
    /// Run the timer in the foreground until Ctrl-C
    Run {
        /// Stop after this many phases complete
        #[arg(long)]
        phases: Option<u32>,
    },
}

/// What survives between CLI invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTimer {
    #[serde(flatten)]
    snapshot: Snapshot,
    /// Countdown anchor while running; `None` when stopped.
    #[serde(default)]
    running_since: Option<DateTime<Utc>>,
}

struct Session {
    db: Database,
    config: Config,
    timer: TimerState,
    running_since: Option<DateTime<Utc>>,
    changes: Arc<Mutex<Vec<PhaseChange>>>,
}

impl Session {
    fn open() -> Result<Self, Box<dyn Error>> {
        let config = Config::load()?;
        let durations = config.durations()?;
        let db = Database::open()?;

        let (timer, running_since) = match load_stored(&db) {
            Some(stored) => (
                TimerState::restore(durations, stored.snapshot)?,
                stored.running_since,
            ),
            None => (TimerState::new(durations), None),
        };

        let changes = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&changes);
        let timer = timer
            .with_observer(move |c: &PhaseChange| -> Result<(), ObserverError> {
                log.lock().unwrap_or_else(PoisonError::into_inner).push(c.clone());
                Ok(())
            })
            .with_observer(RecorderObserver::new(Database::open()?));

        Ok(Self {
            db,
            config,
            timer,
            running_since,
            changes,
        })
    }

    fn catch_up(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        self.running_since = catch_up(&mut self.timer, &self.config, self.running_since, now)?;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    fn save(&self) -> Result<(), Box<dyn Error>> {
        let stored = StoredTimer {
            snapshot: self.timer.snapshot(),
            running_since: self.running_since,
        };
        self.db.kv_set(TIMER_KEY, &serde_json::to_string(&stored)?)?;
        Ok(())
    }

    fn report(&self) -> Result<(), Box<dyn Error>> {
        write_changes(&self.changes, &mut std::io::stdout().lock())?;
        let snapshot = snapshot_event(&self.timer, self.is_running());
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        Ok(())
    }
}

/// Pull-mode catch-up: feed the whole seconds elapsed since `running_since`
/// into a single tick and return the new anchor.
///
/// The anchor keeps its sub-second part while the phase runs on. After a
/// completion the countdown restarts at `now` if the new phase auto-starts,
/// otherwise it stops.
fn catch_up(
    timer: &mut TimerState,
    config: &Config,
    running_since: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, TimerError> {
    let Some(since) = running_since else {
        return Ok(None);
    };
    let elapsed = (now - since).num_seconds().max(0);

    let completed = match timer.tick(elapsed as u64) {
        Ok(done) => done,
        // Observers only run on a transition.
        Err(TimerError::Observer(e)) => {
            warn!("phase observer failed: {e}");
            true
        }
        Err(e) => return Err(e),
    };

    Ok(if !completed {
        Some(since + Duration::seconds(elapsed))
    } else if auto_continues(config, timer.phase()) {
        Some(now)
    } else {
        None
    })
}

/// Drain collected phase changes to `out`, one JSON event per line.
fn write_changes(
    changes: &Mutex<Vec<PhaseChange>>,
    out: &mut impl Write,
) -> Result<usize, Box<dyn Error>> {
    let changes = std::mem::take(&mut *changes.lock().unwrap_or_else(PoisonError::into_inner));
    for change in &changes {
        writeln!(out, "{}", serde_json::to_string(&Event::PhaseChanged(change.clone()))?)?;
    }
    Ok(changes.len())
}

fn load_stored(db: &Database) -> Option<StoredTimer> {
    let json = match db.kv_get(TIMER_KEY) {
        Ok(Some(json)) => json,
        Ok(None) => return None,
        Err(e) => {
            warn!("could not read saved timer: {e}");
            return None;
        }
    };
    match serde_json::from_str(&json) {
        Ok(stored) => Some(stored),
        Err(e) => {
            warn!("discarding unreadable saved timer: {e}");
            None
        }
    }
}

fn snapshot_event(timer: &TimerState, running: bool) -> Event {
    Event::StateSnapshot {
        snapshot: timer.snapshot(),
        nominal_seconds: timer.nominal_seconds(),
        progress: timer.progress(),
        running,
        at: Utc::now(),
    }
}

/// Whether the countdown keeps going once `phase` has begun.
fn auto_continues(config: &Config, phase: Phase) -> bool {
    match phase {
        Phase::Work => config.auto_start_pomodoros,
        Phase::ShortBreak | Phase::LongBreak => config.auto_start_breaks,
        Phase::Paused => true,
    }
}

/// Collaborator failures are logged; the timer keeps going.
fn tolerate(result: Result<(), TimerError>) -> Result<(), TimerError> {
    match result {
        Err(TimerError::Observer(e)) => {
            warn!("phase observer failed: {e}");
            Ok(())
        }
        other => other,
    }
}

/// Terminal bell plus a one-line notice on stderr.
struct TerminalNotifier {
    bell: bool,
}

impl NotificationSink for TerminalNotifier {
    fn notify(&mut self, change: &PhaseChange) -> Result<(), ObserverError> {
        let mut err = std::io::stderr().lock();
        if self.bell && change.cause == ChangeCause::Completed {
            write!(err, "\x07")?;
        }
        writeln!(
            err,
            "{} -> {} ({}) [{} pomodoros]",
            change.from.label(),
            change.to.label(),
            format_clock(change.seconds_left),
            change.completed_work_cycles
        )?;
        Ok(())
    }
}

fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn run_foreground(phases: Option<u32>) -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let mut session = Session::open()?;
        session.catch_up(Utc::now())?;
        // Phases finished while nobody was ticking.
        write_changes(&session.changes, &mut std::io::stdout().lock())?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        session
            .timer
            .subscribe(move |c: &PhaseChange| -> Result<(), ObserverError> {
                // Receiver gone means we are shutting down.
                let _ = tx.send(c.clone());
                Ok(())
            });
        if session.config.notifications.enabled {
            session.timer.subscribe(NotifierObserver::new(TerminalNotifier {
                bell: session.config.notifications.bell,
            }));
        }
        tolerate(session.timer.resume())?;

        let Session { db, config, timer, .. } = session;
        let shared = SharedTimer::new(timer);
        let mut ticker = Ticker::new(shared.clone());
        ticker.start();

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut completed = 0u32;

        loop {
            tokio::select! {
                _ = &mut ctrl_c => break,
                Some(change) = rx.recv() => {
                    println!("{}", serde_json::to_string(&Event::PhaseChanged(change.clone()))?);
                    if change.cause != ChangeCause::Completed {
                        continue;
                    }
                    completed += 1;
                    if phases.is_some_and(|n| completed >= n) || !auto_continues(&config, change.to) {
                        break;
                    }
                }
            }
        }

        ticker.stop().await;

        let timer = shared.lock();
        let stored = StoredTimer {
            snapshot: timer.snapshot(),
            running_since: None,
        };
        db.kv_set(TIMER_KEY, &serde_json::to_string(&stored)?)?;
        println!("{}", serde_json::to_string_pretty(&snapshot_event(&timer, false))?);
        Ok::<(), Box<dyn Error>>(())
    })
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn Error>> {
    match action {
        TimerAction::Run { phases } => return run_foreground(phases),
        TimerAction::Reset => {
            Database::open()?.kv_delete(TIMER_KEY)?;
            let session = Session::open()?;
            session.save()?;
            return session.report();
        }
        _ => {}
    }

    let mut session = Session::open()?;
    let now = Utc::now();
    session.catch_up(now)?;

    match action {
        TimerAction::Start => {
            tolerate(session.timer.resume())?;
            if !session.is_running() {
                session.running_since = Some(now);
            }
        }
        TimerAction::Stop => session.running_since = None,
        TimerAction::Pause => tolerate(session.timer.pause())?,
        TimerAction::Resume => tolerate(session.timer.resume())?,
        TimerAction::Skip => {
            tolerate(session.timer.advance())?;
            if session.is_running() {
                session.running_since = Some(now);
            }
        }
        TimerAction::ResetPhase => {
            session.timer.reset_current_phase();
            if session.is_running() {
                session.running_since = Some(now);
            }
        }
        TimerAction::Status => {}
        TimerAction::Run { .. } | TimerAction::Reset => unreachable!("handled above"),
    }

    session.save()?;
    session.report()
}
