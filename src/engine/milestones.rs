use serde::{Deserialize, Serialize};

pub const MINOR_INTERVAL: u64 = 100;
pub const MAJOR_INTERVAL: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MilestoneTier {
    Minor,
    Major,
}

/// Highest count at which each tier has fired in the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneMarkers {
    pub last_minor: u64,
    pub last_major: u64,
}

impl MilestoneMarkers {
    /// Returns the tier reached at `count`, if any, and advances its marker.
    ///
    /// A count that is a multiple of both intervals only fires the major tier.
    pub fn check(&mut self, count: u64) -> Option<MilestoneTier> {
        if count == 0 {
            return None;
        }
        if count % MAJOR_INTERVAL == 0 && count > self.last_major {
            self.last_major = count;
            return Some(MilestoneTier::Major);
        }
        if count % MINOR_INTERVAL == 0 && count > self.last_minor && count % MAJOR_INTERVAL != 0 {
            self.last_minor = count;
            return Some(MilestoneTier::Minor);
        }
        None
    }
}
