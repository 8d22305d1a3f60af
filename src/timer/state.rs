use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Expired,
}

/// Countdown bookkeeping.
///
/// Elapsed time is `elapsed_baseline` plus the time since `running_anchor`; the anchor is only
/// set while running, so paused stretches never count toward the target.
#[derive(Debug, Clone, Default)]
pub struct TimerState {
    pub status: TimerStatus,
    pub target: Duration,
    /// Bumped on every start/resume so a stale expiry task can tell it has been superseded.
    pub generation: u64,
    elapsed_baseline: Duration,
    running_anchor: Option<Instant>,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, target: Duration, now: Instant) {
        *self = Self {
            status: TimerStatus::Running,
            target,
            generation: self.generation.wrapping_add(1),
            elapsed_baseline: Duration::ZERO,
            running_anchor: Some(now),
        };
    }

    pub fn pause(&mut self, now: Instant) {
        if let Some(anchor) = self.running_anchor.take() {
            self.elapsed_baseline += now.saturating_duration_since(anchor);
        }
        self.status = TimerStatus::Paused;
    }

    pub fn resume(&mut self, now: Instant) {
        self.status = TimerStatus::Running;
        self.running_anchor = Some(now);
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn expire(&mut self) {
        self.status = TimerStatus::Expired;
        self.running_anchor = None;
        self.elapsed_baseline = self.target;
    }

    pub fn cancel(&mut self) {
        *self = Self {
            generation: self.generation.wrapping_add(1),
            ..Self::default()
        };
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        let elapsed = match self.running_anchor {
            Some(anchor) => self.elapsed_baseline + now.saturating_duration_since(anchor),
            None => self.elapsed_baseline,
        };
        elapsed.min(self.target)
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.status {
            TimerStatus::Idle | TimerStatus::Expired => Duration::ZERO,
            TimerStatus::Running | TimerStatus::Paused => {
                self.target.saturating_sub(self.elapsed(now))
            }
        }
    }

    /// Share of the target already elapsed, from 0 to 100.
    pub fn progress_percent(&self, now: Instant) -> f64 {
        match self.status {
            TimerStatus::Idle => 0.0,
            TimerStatus::Expired => 100.0,
            _ if self.target.is_zero() => 100.0,
            _ => self.elapsed(now).as_secs_f64() / self.target.as_secs_f64() * 100.0,
        }
    }
}
