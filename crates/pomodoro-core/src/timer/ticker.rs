//! Push-mode countdown.
//!
//! A [`Ticker`] owns one background Tokio task that wakes roughly once a
//! second and feeds the measured wall-clock delta into the shared
//! [`TimerState`]. The host keeps a [`SharedTimer`] clone for pause, resume
//! and skip; every operation runs under the same mutex, so a pause is never
//! observed halfway through a tick.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::{Phase, Snapshot, TimerState};
use crate::error::TimerError;

/// Thread-safe handle to a [`TimerState`].
#[derive(Clone, Debug)]
pub struct SharedTimer {
    inner: Arc<Mutex<TimerState>>,
}

impl SharedTimer {
    pub fn new(state: TimerState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Lock the timer. A panic inside an observer does not leave the
    /// state half-written, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tick(&self, delta_seconds: u64) -> Result<bool, TimerError> {
        self.lock().tick(delta_seconds)
    }

    pub fn advance(&self) -> Result<(), TimerError> {
        self.lock().advance()
    }

    pub fn pause(&self) -> Result<(), TimerError> {
        self.lock().pause()
    }

    pub fn resume(&self) -> Result<(), TimerError> {
        self.lock().resume()
    }

    pub fn reset_current_phase(&self) {
        self.lock().reset_current_phase()
    }

    pub fn transition_to(&self, target: Phase) -> Result<(), TimerError> {
        self.lock().transition_to(target)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot()
    }
}

struct Running {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Background ticking for a [`SharedTimer`].
pub struct Ticker {
    timer: SharedTimer,
    period: Duration,
    running: Option<Running>,
}

impl Ticker {
    pub fn new(timer: SharedTimer) -> Self {
        Self::with_period(timer, Duration::from_secs(1))
    }

    pub fn with_period(timer: SharedTimer, period: Duration) -> Self {
        Self {
            timer,
            period,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Begin ticking. Does nothing if already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run(self.timer.clone(), self.period, stop_rx));
        self.running = Some(Running { stop, handle });
        info!(period_ms = self.period.as_millis() as u64, "ticker started");
    }

    /// Halt ticking without touching the timer state.
    ///
    /// Once this returns the background task has exited and no further
    /// tick will reach the timer.
    pub async fn stop(&mut self) {
        let Some(Running { stop, handle }) = self.running.take() else {
            return;
        };
        // The task may already be gone; a closed channel is fine.
        let _ = stop.send(());
        if let Err(e) = handle.await {
            error!("ticker task failed: {e}");
        }
        info!("ticker stopped");
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.handle.abort();
        }
    }
}

async fn run(timer: SharedTimer, period: Duration, mut stop: oneshot::Receiver<()>) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately.
    interval.tick().await;

    let mut last = Instant::now();
    let mut carry = Duration::ZERO;

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            _ = interval.tick() => {}
        }

        let now = Instant::now();
        carry += now.duration_since(last);
        last = now;

        let whole = carry.as_secs();
        if whole == 0 {
            continue;
        }
        carry -= Duration::from_secs(whole);

        match timer.tick(whole) {
            Ok(true) => debug!(elapsed = whole, "phase completed by ticker"),
            Ok(false) => {}
            // Nobody to hand the error to; keep time regardless.
            Err(TimerError::Observer(e)) => warn!("phase observer failed during tick: {e}"),
            Err(e) => warn!("tick failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObserverError;
    use crate::events::PhaseChange;
    use crate::timer::Durations;

    fn shared(work: u32) -> SharedTimer {
        SharedTimer::new(TimerState::new(
            Durations::with_default_interval(work, 1, 1).unwrap(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second() {
        let timer = shared(25);
        let mut ticker = Ticker::new(timer.clone());
        ticker.start();
        time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(timer.snapshot().seconds_left, 1495);
        ticker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let timer = shared(25);
        let mut ticker = Ticker::new(timer.clone());
        ticker.start();
        ticker.start();
        assert!(ticker.is_running());
        time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(timer.snapshot().seconds_left, 1495);
        ticker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn completes_phase_and_resets_countdown() {
        let timer = shared(1);
        let mut ticker = Ticker::new(timer.clone());
        ticker.start();
        time::sleep(Duration::from_millis(60_500)).await;
        let snap = timer.snapshot();
        assert_eq!(snap.phase, Phase::ShortBreak);
        assert_eq!(snap.seconds_left, 60);
        assert_eq!(snap.completed_work_cycles, 1);
        ticker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_after_stop() {
        let timer = shared(25);
        let mut ticker = Ticker::new(timer.clone());
        ticker.start();
        time::sleep(Duration::from_millis(3_500)).await;
        ticker.stop().await;
        assert!(!ticker.is_running());
        let frozen = timer.snapshot();
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(timer.snapshot(), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_time_is_not_counted() {
        let timer = shared(25);
        let mut ticker = Ticker::new(timer.clone());
        ticker.start();
        time::sleep(Duration::from_millis(3_500)).await;
        timer.pause().unwrap();
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(timer.snapshot().seconds_left, 1497);
        timer.resume().unwrap();
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(timer.snapshot().seconds_left, 1495);
        ticker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn observer_failure_does_not_stop_ticking() {
        let timer = shared(1);
        timer
            .lock()
            .subscribe(|_: &PhaseChange| -> Result<(), ObserverError> { Err("no speaker".into()) });
        let mut ticker = Ticker::new(timer.clone());
        ticker.start();
        time::sleep(Duration::from_millis(65_500)).await;
        let snap = timer.snapshot();
        assert_eq!(snap.phase, Phase::ShortBreak);
        assert_eq!(snap.seconds_left, 55);
        ticker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_can_restart() {
        let timer = shared(25);
        let mut ticker = Ticker::new(timer.clone());
        ticker.start();
        time::sleep(Duration::from_millis(2_500)).await;
        ticker.stop().await;
        ticker.start();
        time::sleep(Duration::from_millis(2_500)).await;
        ticker.stop().await;
        assert_eq!(timer.snapshot().seconds_left, 1496);
    }
}
