use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::utils::fs::write_atomically;

use super::MilestoneMarkers;

/// The running count carried over between launches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTally {
    pub count: u64,
    #[serde(default)]
    pub active_ms: u64,
    #[serde(default)]
    pub milestones: MilestoneMarkers,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TallyStore {
    path: PathBuf,
}

impl TallyStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn save(&self, tally: &SavedTally) -> Result<(), PersistenceError> {
        let serialized = serde_json::to_vec_pretty(tally)
            .map_err(|err| PersistenceError::json(&self.path, err))?;
        write_atomically(&self.path, &serialized)
            .map_err(|err| PersistenceError::io(&self.path, err))
    }

    /// Missing or unreadable files yield `None`; a fresh tally starts at zero.
    pub fn load(&self) -> Option<SavedTally> {
        let contents = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(tally) => Some(tally),
            Err(err) => {
                warn!("Ignoring malformed tally file {}: {}", self.path.display(), err);
                None
            }
        }
    }
}
