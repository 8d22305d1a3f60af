use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::utils::fs::write_atomically;

use super::SessionStats;

/// What a finished session amounted to; kept so the next launch can show it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub clicks: u64,
    pub duration_seconds: u64,
    pub clicks_per_hour: f64,
    #[serde(default)]
    pub active_region: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn from_stats(stats: &SessionStats, completed_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            clicks: stats.count,
            duration_seconds: stats.active_ms / 1000,
            clicks_per_hour: (stats.clicks_per_hour * 10.0).round() / 10.0,
            active_region: stats.active_region.clone(),
            completed_at,
        }
    }
}

/// Single-slot store for the most recently completed session.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    path: PathBuf,
}

impl SessionHistory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn record(&self, summary: &SessionSummary) -> Result<(), PersistenceError> {
        let serialized = serde_json::to_vec_pretty(summary)
            .map_err(|err| PersistenceError::json(&self.path, err))?;
        write_atomically(&self.path, &serialized)
            .map_err(|err| PersistenceError::io(&self.path, err))
    }

    /// The last recorded session; missing or unreadable files yield `None`.
    pub fn last(&self) -> Option<SessionSummary> {
        let contents = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(summary) => Some(summary),
            Err(err) => {
                warn!("Ignoring malformed session file {}: {}", self.path.display(), err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MilestoneMarkers, SessionState};
    use tempfile::tempdir;

    fn stats(count: u64, active_ms: u64, rate: f64) -> SessionStats {
        SessionStats {
            state: SessionState::Idle,
            count,
            active_region: Some("tabs".into()),
            started_at: None,
            active_ms,
            paused_ms: 0,
            clicks_per_hour: rate,
            clicks_last_hour: 0,
            milestones: MilestoneMarkers::default(),
        }
    }

    #[test]
    fn records_and_reads_back_last_session() {
        let dir = tempdir().expect("tempdir");
        let history = SessionHistory::new(dir.path().join("last_session.json"));
        assert_eq!(history.last(), None);

        let summary = SessionSummary::from_stats(&stats(247, 3_665_400, 241.23), Utc::now());
        history.record(&summary).expect("record");

        let loaded = history.last().expect("summary present");
        assert_eq!(loaded, summary);
        assert_eq!(loaded.duration_seconds, 3665);
        assert_eq!(loaded.clicks_per_hour, 241.2);
    }

    #[test]
    fn malformed_file_reads_as_none() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("last_session.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(SessionHistory::new(path).last(), None);
    }
}
