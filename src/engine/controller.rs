use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::EngineError;
use crate::foreground::{BrowserFilterConfig, ForegroundClassifier};
use crate::input::{ClickEvent, ClickHook, InputObserver, ObserverStatus};
use crate::regions::{Region, RegionStore};

use super::{
    EngineEvent, EventSink, SavedTally, Session, SessionAction, SessionHistory, SessionState,
    SessionStats, SessionSummary, TallyStore,
};

// Per-click tracing; flip off when profiling the hot path.
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// What happened to a single click event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClickOutcome {
    Counted(u64),
    NotRunning,
    IgnoredButton,
    NoActiveRegion,
    OutsideRegion,
    FilteredOut,
}

/// The click-counting session state machine.
///
/// Cloning yields another handle to the same engine. Control operations (start, pause,
/// resume, stop, reset) are serialized through the observer lock, which is always taken
/// before the session lock; the click dispatcher only ever takes the session lock.
#[derive(Clone)]
pub struct ClickEngine {
    session: Arc<Mutex<Session>>,
    observer: Arc<Mutex<InputObserver>>,
    regions: RegionStore,
    classifier: ForegroundClassifier,
    filter: Arc<RwLock<BrowserFilterConfig>>,
    events: EventSink,
    history: Option<SessionHistory>,
    tally: Option<TallyStore>,
}

impl ClickEngine {
    pub fn new(
        regions: RegionStore,
        classifier: ForegroundClassifier,
        hook: Arc<dyn ClickHook>,
        filter: BrowserFilterConfig,
        events: EventSink,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new())),
            observer: Arc::new(Mutex::new(InputObserver::new(hook))),
            regions,
            classifier,
            filter: Arc::new(RwLock::new(filter)),
            events,
            history: None,
            tally: None,
        }
    }

    pub fn with_history(mut self, history: SessionHistory) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_tally(mut self, tally: TallyStore) -> Self {
        self.tally = Some(tally);
        self
    }

    pub fn regions(&self) -> &RegionStore {
        &self.regions
    }

    pub fn upsert_region(&self, region: Region) -> Result<(), EngineError> {
        self.regions.upsert(region)
    }

    /// Removes a region, unsetting it first if it is the active one.
    pub async fn remove_region(&self, name: &str) -> Result<Region, EngineError> {
        let mut session = self.session.lock().await;
        let removed = self.regions.remove(name)?;
        if session.active_region.as_deref() == Some(name) {
            session.active_region = None;
            log_info!("active region '{}' removed", name);
        }
        Ok(removed)
    }

    pub async fn set_active(&self, name: &str) -> Result<(), EngineError> {
        let mut session = self.session.lock().await;
        self.regions.mark_last_used(name)?;
        session.active_region = Some(name.to_string());
        Ok(())
    }

    pub async fn active_region(&self) -> Option<String> {
        self.session.lock().await.active_region.clone()
    }

    /// Selects the region remembered from the previous run, if it still exists.
    pub async fn restore_last_region(&self) -> Option<String> {
        let name = self.regions.last_used_region()?;
        match self.set_active(&name).await {
            Ok(()) => Some(name),
            Err(_) => None,
        }
    }

    pub fn configure_browser_filter(&self, config: BrowserFilterConfig) {
        *self.filter.write().unwrap_or_else(|p| p.into_inner()) = config;
    }

    pub fn browser_filter(&self) -> BrowserFilterConfig {
        self.filter
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state
    }

    pub async fn observer_status(&self) -> ObserverStatus {
        self.observer.lock().await.status()
    }

    pub async fn stats(&self) -> SessionStats {
        let session = self.session.lock().await;
        SessionStats::capture(&session, Instant::now())
    }

    pub async fn start(&self) -> Result<(), EngineError> {
        let mut observer = self.observer.lock().await;
        let mut session = self.session.lock().await;

        match session.state {
            SessionState::Running => return Err(EngineError::AlreadyRunning),
            SessionState::Paused => {
                return Err(EngineError::InvalidState {
                    from: SessionState::Paused,
                    action: SessionAction::Start,
                })
            }
            SessionState::Idle => {}
        }

        let region = session
            .active_region
            .as_deref()
            .filter(|name| self.regions.contains(name))
            .map(str::to_string)
            .ok_or(EngineError::NoActiveRegion)?;

        self.dispatch_clicks(&mut observer)?;
        session.start(Utc::now(), Instant::now())?;
        self.events.emit(EngineEvent::SessionStateChanged {
            state: SessionState::Running,
        });
        log_info!("session started on region '{}'", region);
        Ok(())
    }

    /// Stops listening and counts whatever the hook already delivered before pausing.
    pub async fn pause(&self) -> Result<(), EngineError> {
        let mut observer = self.observer.lock().await;
        self.expect_state(&[SessionState::Running], SessionAction::Pause)
            .await?;
        // The dispatcher takes the session lock per click, so it must not be held here.
        observer.deactivate().await;
        {
            let mut session = self.session.lock().await;
            session.pause(Instant::now())?;
            self.events.emit(EngineEvent::SessionStateChanged {
                state: SessionState::Paused,
            });
            log_info!("session paused at {} clicks", session.count);
        }
        drop(observer);
        self.save_tally().await;
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), EngineError> {
        let mut observer = self.observer.lock().await;
        let mut session = self.session.lock().await;
        if session.state != SessionState::Paused {
            return Err(EngineError::InvalidState {
                from: session.state,
                action: SessionAction::Resume,
            });
        }
        self.dispatch_clicks(&mut observer)?;
        session.resume(Instant::now())?;
        self.events.emit(EngineEvent::SessionStateChanged {
            state: SessionState::Running,
        });
        log_info!("session resumed");
        Ok(())
    }

    /// Ends counting but keeps the tally. Clicks delivered before the call are still
    /// counted; none is evaluated after this returns.
    pub async fn stop(&self) -> Result<(), EngineError> {
        let mut observer = self.observer.lock().await;
        self.expect_state(
            &[SessionState::Running, SessionState::Paused],
            SessionAction::Stop,
        )
        .await?;
        observer.deactivate().await;
        {
            let mut session = self.session.lock().await;
            session.stop(Instant::now())?;
            self.events.emit(EngineEvent::SessionStateChanged {
                state: SessionState::Idle,
            });
            log_info!("session stopped at {} clicks", session.count);
        }
        drop(observer);
        self.save_tally().await;
        Ok(())
    }

    /// Clears the session from any state and records a summary of what was cleared.
    pub async fn reset(&self) -> Result<(), EngineError> {
        let mut observer = self.observer.lock().await;
        observer.deactivate().await;
        let summary = {
            let mut session = self.session.lock().await;
            let summary = summarize(&session);
            let previous_state = session.state;
            let previous_count = session.count;
            session.reset();
            if previous_state != SessionState::Idle {
                self.events.emit(EngineEvent::SessionStateChanged {
                    state: SessionState::Idle,
                });
            }
            if previous_count > 0 {
                self.events.emit(EngineEvent::CountChanged { count: 0 });
            }
            summary
        };
        drop(observer);

        if let Some(summary) = summary {
            self.record_summary(summary).await;
        }
        self.save_tally().await;
        Ok(())
    }

    /// Stops an active session, records its summary and saves the tally without clearing it.
    pub async fn shutdown(&self) {
        if self.state().await != SessionState::Idle {
            if let Err(err) = self.stop().await {
                log_warn!("stop during shutdown failed: {}", err);
            }
        }

        let summary = summarize(&*self.session.lock().await);
        if let Some(summary) = summary {
            self.record_summary(summary).await;
        }
        self.save_tally().await;
    }

    /// Loads the count saved by an earlier launch into an idle, empty session.
    pub async fn restore_tally(&self) -> Option<u64> {
        let store = self.tally.clone()?;
        let saved = tokio::task::spawn_blocking(move || store.load())
            .await
            .ok()
            .flatten()?;

        let mut session = self.session.lock().await;
        if session.state != SessionState::Idle || session.count > 0 {
            return None;
        }
        session.restore(
            saved.count,
            Duration::from_millis(saved.active_ms),
            saved.milestones,
        );
        if saved.count > 0 {
            self.events.emit(EngineEvent::CountChanged { count: saved.count });
        }
        Some(saved.count)
    }

    pub async fn last_session(&self) -> Option<SessionSummary> {
        let history = self.history.clone()?;
        tokio::task::spawn_blocking(move || history.last())
            .await
            .ok()
            .flatten()
    }

    async fn expect_state(
        &self,
        allowed: &[SessionState],
        action: SessionAction,
    ) -> Result<(), EngineError> {
        let state = self.session.lock().await.state;
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                from: state,
                action,
            })
        }
    }

    fn dispatch_clicks(&self, observer: &mut InputObserver) -> Result<(), EngineError> {
        let engine = self.clone();
        observer.activate(move |event: ClickEvent| {
            let engine = engine.clone();
            async move {
                engine.on_click(event).await;
            }
        })?;
        Ok(())
    }

    async fn record_summary(&self, summary: SessionSummary) {
        let Some(history) = self.history.clone() else {
            return;
        };
        let result = tokio::task::spawn_blocking(move || history.record(&summary)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log_warn!("failed to record session summary: {}", err),
            Err(err) => log_warn!("session summary writer failed: {}", err),
        }
    }

    async fn save_tally(&self) {
        let Some(store) = self.tally.clone() else {
            return;
        };
        let tally = {
            let session = self.session.lock().await;
            SavedTally {
                count: session.count,
                active_ms: session.active_duration(Instant::now()).as_millis() as u64,
                milestones: session.milestones,
                saved_at: Utc::now(),
            }
        };
        match tokio::task::spawn_blocking(move || store.save(&tally)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log_warn!("failed to save tally: {}", err),
            Err(err) => log_warn!("tally writer failed: {}", err),
        }
    }

    /// Resolves the foreground application off the async workers; the lookup may spawn
    /// helper processes.
    async fn foreground_allowed(&self, filter: BrowserFilterConfig) -> bool {
        let classifier = self.classifier.clone();
        match tokio::task::spawn_blocking(move || classifier.is_allowed_foreground_window(&filter))
            .await
        {
            Ok(allowed) => allowed,
            Err(err) => {
                log_warn!("foreground lookup failed: {}", err);
                false
            }
        }
    }

    /// Runs one click through the hit-test and filter pipeline.
    pub async fn on_click(&self, event: ClickEvent) -> ClickOutcome {
        if !event.is_primary() {
            return ClickOutcome::IgnoredButton;
        }

        let active = {
            let session = self.session.lock().await;
            if session.state != SessionState::Running {
                return ClickOutcome::NotRunning;
            }
            session.active_region.clone()
        };

        let Some(region) = active.as_deref().and_then(|name| self.regions.get(name)) else {
            log_debug!("click at ({}, {}) ignored: no active region", event.x, event.y);
            return ClickOutcome::NoActiveRegion;
        };

        if !region.contains(event.x, event.y) {
            log_debug!(
                "click at ({}, {}) outside region '{}'",
                event.x,
                event.y,
                region.name
            );
            return ClickOutcome::OutsideRegion;
        }

        let filter = self.browser_filter();
        if filter.enabled && !self.foreground_allowed(filter).await {
            log_debug!("click at ({}, {}) filtered by foreground app", event.x, event.y);
            return ClickOutcome::FilteredOut;
        }

        let mut session = self.session.lock().await;
        // State may have changed while the foreground was being resolved.
        if session.state != SessionState::Running {
            return ClickOutcome::NotRunning;
        }
        if session.active_region.as_deref() != Some(region.name.as_str()) {
            return ClickOutcome::NoActiveRegion;
        }

        let count = session.record_click(Instant::now());
        self.events.emit(EngineEvent::CountChanged { count });
        if let Some(tier) = session.milestones.check(count) {
            log_info!("milestone {:?} reached at {} clicks", tier, count);
            self.events.emit(EngineEvent::Milestone { tier, count });
        }
        ClickOutcome::Counted(count)
    }
}

fn summarize(session: &Session) -> Option<SessionSummary> {
    let now = Instant::now();
    session
        .has_activity(now)
        .then(|| SessionSummary::from_stats(&SessionStats::capture(session, now), Utc::now()))
}
