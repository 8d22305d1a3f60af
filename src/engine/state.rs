use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::EngineError;

use super::milestones::MilestoneMarkers;

const RECENT_WINDOW: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Paused,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionAction::Start => "start",
            SessionAction::Pause => "pause",
            SessionAction::Resume => "resume",
            SessionAction::Stop => "stop",
        };
        f.write_str(label)
    }
}

/// Counting state for one run from Start to Reset.
///
/// Active time is tracked as a baseline plus an anchor that is only set while running, so
/// paused and idle stretches never contribute to the session duration.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub state: SessionState,
    pub count: u64,
    pub active_region: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub milestones: MilestoneMarkers,
    active_baseline: Duration,
    running_anchor: Option<Instant>,
    paused_accum: Duration,
    paused_at: Option<Instant>,
    recent_clicks: VecDeque<Instant>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn transition(
        &mut self,
        allowed: &[SessionState],
        to: SessionState,
        action: SessionAction,
    ) -> Result<(), EngineError> {
        if allowed.contains(&self.state) {
            self.state = to;
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                from: self.state,
                action,
            })
        }
    }

    pub fn start(&mut self, wall_clock: DateTime<Utc>, now: Instant) -> Result<(), EngineError> {
        if self.state == SessionState::Running {
            return Err(EngineError::AlreadyRunning);
        }
        self.transition(&[SessionState::Idle], SessionState::Running, SessionAction::Start)?;
        if self.started_at.is_none() {
            self.started_at = Some(wall_clock);
        }
        self.running_anchor = Some(now);
        Ok(())
    }

    pub fn pause(&mut self, now: Instant) -> Result<(), EngineError> {
        self.transition(
            &[SessionState::Running],
            SessionState::Paused,
            SessionAction::Pause,
        )?;
        self.fold_anchor(now);
        self.paused_at = Some(now);
        Ok(())
    }

    pub fn resume(&mut self, now: Instant) -> Result<(), EngineError> {
        self.transition(
            &[SessionState::Paused],
            SessionState::Running,
            SessionAction::Resume,
        )?;
        self.fold_pause(now);
        self.running_anchor = Some(now);
        Ok(())
    }

    pub fn stop(&mut self, now: Instant) -> Result<(), EngineError> {
        self.transition(
            &[SessionState::Running, SessionState::Paused],
            SessionState::Idle,
            SessionAction::Stop,
        )?;
        self.fold_anchor(now);
        self.fold_pause(now);
        Ok(())
    }

    /// Clears the tally, timestamps and milestone markers. The active region is kept.
    pub fn reset(&mut self) {
        *self = Self {
            active_region: self.active_region.take(),
            ..Self::default()
        };
    }

    /// Carries a count over from an earlier launch. Only valid while idle.
    pub fn restore(&mut self, count: u64, active: Duration, milestones: MilestoneMarkers) {
        self.count = count;
        self.active_baseline = active;
        self.milestones = milestones;
    }

    fn fold_anchor(&mut self, now: Instant) {
        if let Some(anchor) = self.running_anchor.take() {
            self.active_baseline += now.saturating_duration_since(anchor);
        }
    }

    fn fold_pause(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_accum += now.saturating_duration_since(paused_at);
        }
    }

    /// Increments the tally and returns the new count.
    pub fn record_click(&mut self, now: Instant) -> u64 {
        self.count += 1;
        self.recent_clicks.push_back(now);
        self.prune_recent(now);
        self.count
    }

    fn prune_recent(&mut self, now: Instant) {
        while let Some(oldest) = self.recent_clicks.front() {
            if now.saturating_duration_since(*oldest) > RECENT_WINDOW {
                self.recent_clicks.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn active_duration(&self, now: Instant) -> Duration {
        match self.running_anchor {
            Some(anchor) => self.active_baseline + now.saturating_duration_since(anchor),
            None => self.active_baseline,
        }
    }

    pub fn paused_duration(&self, now: Instant) -> Duration {
        match self.paused_at {
            Some(paused_at) => self.paused_accum + now.saturating_duration_since(paused_at),
            None => self.paused_accum,
        }
    }

    pub fn clicks_last_hour(&self, now: Instant) -> usize {
        self.recent_clicks
            .iter()
            .filter(|at| now.saturating_duration_since(**at) <= RECENT_WINDOW)
            .count()
    }

    /// Counted clicks per hour of active time; zero until a full second has elapsed.
    pub fn clicks_per_hour(&self, now: Instant) -> f64 {
        let elapsed = self.active_duration(now);
        if elapsed < Duration::from_secs(1) {
            return 0.0;
        }
        self.count as f64 / (elapsed.as_secs_f64() / 3600.0)
    }

    pub fn has_activity(&self, now: Instant) -> bool {
        self.count > 0 || !self.active_duration(now).is_zero()
    }
}
