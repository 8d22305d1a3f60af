mod classifier;
mod config;
mod probe;

pub use classifier::{ForegroundClassifier, ForegroundError, ForegroundProbe, StaticProbe};
pub use config::{normalize_process_name, BrowserFilterConfig};
pub use probe::SystemProbe;
