mod durations;
mod phase;
mod state;
mod ticker;

pub use durations::Durations;
pub use phase::Phase;
pub use state::{Snapshot, TimerState};
pub use ticker::{SharedTimer, Ticker};
