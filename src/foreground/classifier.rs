use std::sync::Arc;

use thiserror::Error;

use super::BrowserFilterConfig;

// Called once per evaluated click.
const ENABLE_LOGS: bool = true;

use crate::log_debug;

#[derive(Debug, Error)]
pub enum ForegroundError {
    #[error("no foreground window")]
    NoForegroundWindow,
    #[error("process {0} is no longer running")]
    ProcessGone(u32),
    #[error("foreground query failed: {0}")]
    Query(String),
    #[error("foreground detection is not supported on this platform")]
    Unsupported,
}

/// Source of the process name that owns the focused top-level window.
pub trait ForegroundProbe: Send + Sync {
    fn foreground_process_name(&self) -> Result<String, ForegroundError>;
}

/// Decides whether the current foreground application may produce counted clicks.
#[derive(Clone)]
pub struct ForegroundClassifier {
    probe: Arc<dyn ForegroundProbe>,
}

impl ForegroundClassifier {
    pub fn new(probe: Arc<dyn ForegroundProbe>) -> Self {
        Self { probe }
    }

    /// Returns true when filtering is off or the foreground process is allowed.
    ///
    /// Resolution failures count as "not allowed"; they are expected while windows open and
    /// close and are not reported as errors.
    pub fn is_allowed_foreground_window(&self, config: &BrowserFilterConfig) -> bool {
        if !config.enabled {
            return true;
        }

        match self.probe.foreground_process_name() {
            Ok(name) => {
                let allowed = config.allows(&name);
                log_debug!("foreground process '{}' allowed={}", name, allowed);
                allowed
            }
            Err(err) => {
                log_debug!("foreground process unresolved: {}", err);
                false
            }
        }
    }
}

/// Probe returning a fixed answer. Used by tests and by hosts that do their own detection.
#[derive(Debug, Default)]
pub struct StaticProbe {
    name: std::sync::Mutex<Option<String>>,
}

impl StaticProbe {
    pub fn new(name: Option<&str>) -> Self {
        Self {
            name: std::sync::Mutex::new(name.map(str::to_string)),
        }
    }

    pub fn set(&self, name: Option<&str>) {
        let mut guard = self.name.lock().unwrap_or_else(|p| p.into_inner());
        *guard = name.map(str::to_string);
    }
}

impl ForegroundProbe for StaticProbe {
    fn foreground_process_name(&self) -> Result<String, ForegroundError> {
        self.name
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .ok_or(ForegroundError::NoForegroundWindow)
    }
}
