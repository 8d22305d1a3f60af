mod controller;
mod state;

pub use controller::{CountdownTimer, TimerSnapshot};
pub use state::{TimerState, TimerStatus};
