use std::{
    collections::HashSet,
    fs,
    path::Path,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::Utc;
use hashlink::LinkedHashMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, PersistenceError};
use crate::utils::fs::write_atomically;

use super::Region;

const REGION_FILE_VERSION: u32 = 1;

/// Insertion-ordered set of regions plus the name of the most recently activated one.
#[derive(Debug, Clone, Default)]
struct RegionSet {
    regions: LinkedHashMap<String, Region>,
    last_used: Option<String>,
}

impl RegionSet {
    fn get(&self, name: &str) -> Option<&Region> {
        self.regions.get(name)
    }

    fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    fn len(&self) -> usize {
        self.regions.len()
    }

    fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RegionFile {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    regions: Vec<Region>,
    #[serde(default)]
    last_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<String>,
}

fn default_version() -> u32 {
    REGION_FILE_VERSION
}

/// Shared handle to the region set. Cloning is cheap; all clones see the same regions.
///
/// Mutations take the write lock for their whole duration and lookups copy out of a read
/// guard, so a hit-test never observes a half-applied edit.
#[derive(Debug, Clone, Default)]
pub struct RegionStore {
    inner: Arc<RwLock<RegionSet>>,
}

impl RegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegionSet> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegionSet> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts a new region or replaces the one with the same name in place.
    pub fn upsert(&self, region: Region) -> Result<(), EngineError> {
        region.validate()?;
        let mut set = self.write();
        match set.regions.get_mut(&region.name) {
            Some(existing) => *existing = region,
            None => {
                set.regions.insert(region.name.clone(), region);
            }
        }
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<Region, EngineError> {
        let mut set = self.write();
        let removed = set
            .regions
            .remove(name)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))?;
        if set.last_used.as_deref() == Some(name) {
            set.last_used = None;
        }
        Ok(removed)
    }

    pub fn get(&self, name: &str) -> Option<Region> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().regions.contains_key(name)
    }

    pub fn list(&self) -> Vec<Region> {
        self.read().iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        *self.write() = RegionSet::default();
    }

    pub fn last_used_region(&self) -> Option<String> {
        self.read().last_used.clone()
    }

    pub fn mark_last_used(&self, name: &str) -> Result<(), EngineError> {
        let mut set = self.write();
        if !set.regions.contains_key(name) {
            return Err(EngineError::NotFound(name.to_string()));
        }
        set.last_used = Some(name.to_string());
        Ok(())
    }

    /// Replaces the whole set with the contents of `path`.
    ///
    /// On any failure the store is left empty, never partially populated.
    pub fn load(&self, path: &Path) -> Result<usize, EngineError> {
        match read_region_file(path) {
            Ok(set) => {
                let count = set.len();
                *self.write() = set;
                info!("Loaded {} region(s) from {}", count, path.display());
                Ok(count)
            }
            Err(err) => {
                self.clear();
                warn!("Region load from {} failed: {}", path.display(), err);
                Err(err.into())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let file = {
            let set = self.read();
            RegionFile {
                version: REGION_FILE_VERSION,
                regions: set.iter().cloned().collect(),
                last_region: set.last_used.clone(),
                saved_at: Some(Utc::now().to_rfc3339()),
            }
        };

        let serialized =
            serde_json::to_vec_pretty(&file).map_err(|err| PersistenceError::json(path, err))?;
        write_atomically(path, &serialized).map_err(|err| PersistenceError::io(path, err))?;
        Ok(())
    }
}

fn read_region_file(path: &Path) -> Result<RegionSet, PersistenceError> {
    let contents = fs::read_to_string(path).map_err(|err| PersistenceError::io(path, err))?;
    let file: RegionFile =
        serde_json::from_str(&contents).map_err(|err| PersistenceError::json(path, err))?;

    let invalid = |reason: String| PersistenceError::Invalid {
        path: path.to_path_buf(),
        reason,
    };

    let mut seen = HashSet::new();
    let mut regions = LinkedHashMap::new();
    for region in file.regions {
        region.validate().map_err(|err| invalid(err.to_string()))?;
        if !seen.insert(region.name.clone()) {
            return Err(invalid(format!("duplicate region name '{}'", region.name)));
        }
        regions.insert(region.name.clone(), region);
    }

    // A dangling last-used name is dropped rather than failing the load.
    let last_used = file
        .last_region
        .filter(|name| regions.contains_key(name.as_str()));

    Ok(RegionSet { regions, last_used })
}
