mod controller;
mod events;
mod history;
mod milestones;
mod state;
mod stats;
mod tally;

pub use controller::{ClickEngine, ClickOutcome};
pub use events::{EngineEvent, EventSink};
pub use history::{SessionHistory, SessionSummary};
pub use milestones::{MilestoneMarkers, MilestoneTier, MAJOR_INTERVAL, MINOR_INTERVAL};
pub use state::{Session, SessionAction, SessionState};
pub use stats::SessionStats;
pub use tally::{SavedTally, TallyStore};
