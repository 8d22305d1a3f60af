use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::PathBuf,
    sync::RwLock,
    time::Duration,
};

use crate::foreground::BrowserFilterConfig;
use crate::utils::fs::write_atomically;

pub const DATA_DIR_ENV: &str = "CLICKTALLY_DATA_DIR";
pub const SETTINGS_FILE: &str = "settings.json";
pub const REGIONS_FILE: &str = "regions.json";
pub const LAST_SESSION_FILE: &str = "last_session.json";
pub const TALLY_FILE: &str = "tally.json";

const DEFAULT_TIMER_MINUTES: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    browser_filter: BrowserFilterConfig,
    default_timer_minutes: u64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            browser_filter: BrowserFilterConfig::default(),
            default_timer_minutes: DEFAULT_TIMER_MINUTES,
        }
    }
}

/// Resolves where settings, regions and session history live.
pub fn resolve_data_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join("clicktally"))
        .ok_or_else(|| anyhow!("no data directory available; set {}", DATA_DIR_ENV))
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring malformed settings in {}: {}", path.display(), err);
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn browser_filter(&self) -> BrowserFilterConfig {
        self.read().browser_filter.clone()
    }

    pub fn update_browser_filter(&self, config: BrowserFilterConfig) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(|p| p.into_inner());
        guard.browser_filter = config;
        self.persist(&guard)
    }

    pub fn default_timer(&self) -> Duration {
        Duration::from_secs(self.read().default_timer_minutes.saturating_mul(60))
    }

    pub fn update_default_timer_minutes(&self, minutes: u64) -> Result<()> {
        if minutes == 0 {
            return Err(anyhow!("default timer length must be at least one minute"));
        }
        let mut guard = self.data.write().unwrap_or_else(|p| p.into_inner());
        guard.default_timer_minutes = minutes;
        self.persist(&guard)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|p| p.into_inner())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        write_atomically(&self.path, serialized.as_bytes())
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
