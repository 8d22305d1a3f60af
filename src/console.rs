use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::info;

use crate::commands::{Command, HELP};
use crate::engine::ClickEngine;
use crate::foreground::BrowserFilterConfig;
use crate::input::{ClickEvent, SyntheticClickHook};
use crate::regions::Region;
use crate::settings::SettingsStore;
use crate::timer::CountdownTimer;

/// Executes parsed console commands against the running engine.
pub struct Console {
    engine: ClickEngine,
    timer: CountdownTimer,
    settings: Arc<SettingsStore>,
    regions_path: PathBuf,
    /// Present when clicks are fed by hand instead of by the OS hook.
    synthetic: Option<Arc<SyntheticClickHook>>,
}

impl Console {
    pub fn new(
        engine: ClickEngine,
        timer: CountdownTimer,
        settings: Arc<SettingsStore>,
        regions_path: PathBuf,
        synthetic: Option<Arc<SyntheticClickHook>>,
    ) -> Self {
        Self {
            engine,
            timer,
            settings,
            regions_path,
            synthetic,
        }
    }

    pub fn engine(&self) -> &ClickEngine {
        &self.engine
    }

    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    /// Runs one command and returns the text to show the user.
    pub async fn execute(&self, command: Command) -> Result<String> {
        match command {
            Command::AddRegion {
                name,
                x0,
                y0,
                x1,
                y1,
            } => {
                let region = Region::new(name.clone(), x0, y0, x1, y1)?;
                self.engine.upsert_region(region)?;
                self.save_regions().await?;
                Ok(format!("region '{}' saved", name))
            }
            Command::RemoveRegion(name) => {
                self.engine.remove_region(&name).await?;
                self.save_regions().await?;
                Ok(format!("region '{}' removed", name))
            }
            Command::UseRegion(name) => {
                self.engine.set_active(&name).await?;
                self.save_regions().await?;
                Ok(format!("active region is '{}'", name))
            }
            Command::ListRegions => self.list_regions().await,
            Command::SaveRegions => {
                self.save_regions().await?;
                Ok(format!("regions written to {}", self.regions_path.display()))
            }
            Command::LoadRegions => {
                let regions = self.engine.regions().clone();
                let path = self.regions_path.clone();
                let loaded = tokio::task::spawn_blocking(move || regions.load(&path))
                    .await
                    .context("region loader panicked")??;
                let restored = self.engine.restore_last_region().await;
                Ok(match restored {
                    Some(name) => format!("loaded {} region(s); active region is '{}'", loaded, name),
                    None => format!("loaded {} region(s)", loaded),
                })
            }
            Command::Start => {
                self.engine.start().await?;
                Ok("counting".into())
            }
            Command::Pause => {
                self.engine.pause().await?;
                Ok("paused".into())
            }
            Command::Resume => {
                self.engine.resume().await?;
                Ok("counting".into())
            }
            Command::Stop => {
                self.engine.stop().await?;
                let stats = self.engine.stats().await;
                Ok(format!("stopped at {} clicks", stats.count))
            }
            Command::Reset => {
                self.engine.reset().await?;
                Ok("session reset".into())
            }
            Command::ShowFilter => Ok(serde_json::to_string(&self.engine.browser_filter())?),
            Command::FilterEnabled(enabled) => {
                let mut config = self.engine.browser_filter();
                config.enabled = enabled;
                self.apply_filter(config).await?;
                Ok(format!(
                    "browser filter {}",
                    if enabled { "enabled" } else { "disabled" }
                ))
            }
            Command::FilterAllow(names) => {
                let config = BrowserFilterConfig::allowing(names);
                let summary = config
                    .allowed_process_names
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ");
                self.apply_filter(config).await?;
                Ok(format!("browser filter allows: {}", summary))
            }
            Command::TimerStart(duration) => {
                let duration = duration.unwrap_or_else(|| self.settings.default_timer());
                self.timer.start(duration).await?;
                Ok(format!("timer set for {}s", duration.as_secs()))
            }
            Command::TimerPause => {
                self.timer.pause().await?;
                Ok("timer paused".into())
            }
            Command::TimerResume => {
                self.timer.resume().await?;
                Ok("timer resumed".into())
            }
            Command::TimerCancel => {
                self.timer.cancel().await;
                Ok("timer cancelled".into())
            }
            Command::TimerStatus => Ok(serde_json::to_string(&self.timer.snapshot().await)?),
            Command::TimerDefault(minutes) => {
                let settings = self.settings.clone();
                tokio::task::spawn_blocking(move || settings.update_default_timer_minutes(minutes))
                    .await??;
                Ok(format!(
                    "default timer is {} minute{}",
                    minutes,
                    if minutes == 1 { "" } else { "s" }
                ))
            }
            Command::Stats => {
                let stats = self.engine.stats().await;
                Ok(format!(
                    "{} ({})",
                    serde_json::to_string(&stats)?,
                    stats.formatted_duration()
                ))
            }
            Command::LastSession => match self.engine.last_session().await {
                Some(summary) => Ok(serde_json::to_string(&summary)?),
                None => Ok("no previous session".into()),
            },
            Command::Click { x, y, button } => {
                let hook = self
                    .synthetic
                    .as_ref()
                    .ok_or_else(|| anyhow!("synthetic clicks are unavailable with the OS hook"))?;
                if hook.inject(ClickEvent::new(x, y, button)) {
                    Ok(format!("click at ({}, {}) delivered", x, y))
                } else {
                    Ok("not counting; click dropped".into())
                }
            }
            Command::Help => Ok(HELP.into()),
            Command::Quit => Ok(String::new()),
        }
    }

    async fn list_regions(&self) -> Result<String> {
        let active = self.engine.active_region().await;
        let regions = self.engine.regions().list();
        if regions.is_empty() {
            return Ok("no regions".into());
        }
        let lines: Vec<String> = regions
            .iter()
            .map(|region| {
                let marker = if active.as_deref() == Some(region.name.as_str()) {
                    '*'
                } else {
                    ' '
                };
                format!(
                    "{} {} ({},{})-({},{}) {}x{}",
                    marker,
                    region.name,
                    region.x0,
                    region.y0,
                    region.x1,
                    region.y1,
                    region.width(),
                    region.height()
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    /// Writes the region set to disk. In-memory changes are kept when the write fails.
    async fn save_regions(&self) -> Result<()> {
        let regions = self.engine.regions().clone();
        let path = self.regions_path.clone();
        tokio::task::spawn_blocking(move || regions.save(&path))
            .await
            .context("region writer panicked")?
            .context("change applied but regions could not be saved")?;
        Ok(())
    }

    async fn apply_filter(&self, config: BrowserFilterConfig) -> Result<()> {
        self.engine.configure_browser_filter(config.clone());
        let settings = self.settings.clone();
        tokio::task::spawn_blocking(move || settings.update_browser_filter(config))
            .await
            .context("settings writer panicked")??;
        info!("Browser filter updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineEvent, EventSink, SessionHistory, SessionState};
    use crate::foreground::{ForegroundClassifier, StaticProbe};
    use crate::regions::RegionStore;
    use tempfile::{tempdir, TempDir};
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        console: Console,
        _dir: TempDir,
        _events: UnboundedReceiver<EngineEvent>,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let settings =
            Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
        let (sink, events) = EventSink::channel();
        let hook = Arc::new(SyntheticClickHook::new());
        let engine = ClickEngine::new(
            RegionStore::new(),
            ForegroundClassifier::new(Arc::new(StaticProbe::new(Some("Google Chrome")))),
            hook.clone(),
            settings.browser_filter(),
            sink.clone(),
        )
        .with_history(SessionHistory::new(dir.path().join("last_session.json")));
        let console = Console::new(
            engine,
            CountdownTimer::new(sink),
            settings,
            dir.path().join("regions.json"),
            Some(hook),
        );
        Fixture {
            console,
            _dir: dir,
            _events: events,
        }
    }

    async fn run(console: &Console, line: &str) -> Result<String> {
        console.execute(line.parse()?).await
    }

    #[tokio::test]
    async fn region_edits_are_persisted_immediately() {
        let f = fixture();
        run(&f.console, "region add tabs 0 0 100 100").await.unwrap();
        run(&f.console, "region use tabs").await.unwrap();

        let reloaded = RegionStore::new();
        reloaded.load(&f.console.regions_path).unwrap();
        assert!(reloaded.contains("tabs"));
        assert_eq!(reloaded.last_used_region().as_deref(), Some("tabs"));

        let listing = run(&f.console, "region ls").await.unwrap();
        assert!(listing.starts_with("* tabs (0,0)-(100,100)"));
    }

    #[tokio::test]
    async fn synthetic_clicks_reach_the_engine() {
        let f = fixture();
        run(&f.console, "region add tabs 0 0 100 100").await.unwrap();
        run(&f.console, "region use tabs").await.unwrap();

        let dropped = run(&f.console, "click 5 5").await.unwrap();
        assert_eq!(dropped, "not counting; click dropped");

        run(&f.console, "start").await.unwrap();
        run(&f.console, "click 5 5").await.unwrap();
        run(&f.console, "click 500 500").await.unwrap();
        // Stop drains clicks already delivered, so the in-region one is counted.
        run(&f.console, "stop").await.unwrap();

        let stats = f.console.engine().stats().await;
        assert_eq!(stats.count, 1);
        assert_eq!(stats.state, SessionState::Idle);
    }

    #[tokio::test]
    async fn start_without_region_reports_error() {
        let f = fixture();
        let err = run(&f.console, "start").await.unwrap_err();
        assert!(err.to_string().contains("no active region"));
    }

    #[tokio::test]
    async fn filter_changes_are_saved_to_settings() {
        let f = fixture();
        run(&f.console, "filter allow firefox").await.unwrap();
        assert!(f.console.engine().browser_filter().allows("firefox.exe"));
        assert!(f.console.settings.browser_filter().allows("firefox"));

        run(&f.console, "filter off").await.unwrap();
        assert!(!f.console.settings.browser_filter().enabled);
    }

    #[tokio::test]
    async fn timer_default_is_persisted_and_used() {
        let f = fixture();
        assert_eq!(
            run(&f.console, "timer default 1").await.unwrap(),
            "default timer is 1 minute"
        );
        assert!(run(&f.console, "timer default 0").await.is_err());
        assert_eq!(run(&f.console, "timer start").await.unwrap(), "timer set for 60s");
        run(&f.console, "timer cancel").await.unwrap();

        let reloaded = SettingsStore::new(f._dir.path().join("settings.json")).unwrap();
        assert_eq!(reloaded.default_timer(), std::time::Duration::from_secs(60));
    }

    #[tokio::test]
    async fn invalid_geometry_is_rejected() {
        let f = fixture();
        let err = run(&f.console, "region add bad 10 10 5 20").await.unwrap_err();
        assert!(err.to_string().contains("invalid geometry"));
        assert!(f.console.engine().regions().is_empty());
    }
}
