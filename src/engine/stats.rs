use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use super::{MilestoneMarkers, Session, SessionState};

/// Point-in-time view of the session for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub state: SessionState,
    pub count: u64,
    pub active_region: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub active_ms: u64,
    pub paused_ms: u64,
    pub clicks_per_hour: f64,
    pub clicks_last_hour: usize,
    pub milestones: MilestoneMarkers,
}

impl SessionStats {
    pub fn capture(session: &Session, now: Instant) -> Self {
        Self {
            state: session.state,
            count: session.count,
            active_region: session.active_region.clone(),
            started_at: session.started_at,
            active_ms: session.active_duration(now).as_millis() as u64,
            paused_ms: session.paused_duration(now).as_millis() as u64,
            clicks_per_hour: session.clicks_per_hour(now),
            clicks_last_hour: session.clicks_last_hour(now),
            milestones: session.milestones,
        }
    }

    /// Active time as `HH:MM:SS`.
    pub fn formatted_duration(&self) -> String {
        let secs = self.active_ms / 1000;
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
