use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

const DEFAULT_BROWSERS: &[&str] = &[
    "chrome.exe",
    "msedge.exe",
    "edge.exe",
    "Google Chrome",
    "Microsoft Edge",
];

/// Which foreground applications a click may come from while filtering is on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserFilterConfig {
    pub enabled: bool,
    pub allowed_process_names: BTreeSet<String>,
}

impl Default for BrowserFilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_process_names: DEFAULT_BROWSERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BrowserFilterConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn allowing<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: true,
            allowed_process_names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Case-insensitive membership test; a trailing `.exe` is ignored on both sides.
    pub fn allows(&self, process_name: &str) -> bool {
        let wanted = normalize_process_name(process_name);
        if wanted.is_empty() {
            return false;
        }
        self.allowed_process_names
            .iter()
            .any(|allowed| normalize_process_name(allowed) == wanted)
    }
}

pub fn normalize_process_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    match lowered.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => lowered,
    }
}
