use std::{sync::Arc, time::Duration};

use log::info;
use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::engine::{EngineEvent, EventSink};
use crate::error::TimerError;

use super::{TimerState, TimerStatus};

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub status: TimerStatus,
    pub target_ms: u64,
    pub remaining_ms: u64,
    pub progress_percent: f64,
}

struct ExpiryTask {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// A countdown that emits [`EngineEvent::TimerExpired`] once when it runs out.
///
/// Independent of any click session. Starting again replaces the running countdown.
#[derive(Clone)]
pub struct CountdownTimer {
    state: Arc<Mutex<TimerState>>,
    expiry: Arc<Mutex<Option<ExpiryTask>>>,
    events: EventSink,
}

impl CountdownTimer {
    pub fn new(events: EventSink) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState::new())),
            expiry: Arc::new(Mutex::new(None)),
            events,
        }
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        let guard = self.state.lock().await;
        let now = Instant::now();
        TimerSnapshot {
            status: guard.status,
            target_ms: guard.target.as_millis() as u64,
            remaining_ms: guard.remaining(now).as_millis() as u64,
            progress_percent: guard.progress_percent(now),
        }
    }

    pub async fn status(&self) -> TimerStatus {
        self.state.lock().await.status
    }

    pub async fn remaining(&self) -> Duration {
        self.state.lock().await.remaining(Instant::now())
    }

    pub async fn start(&self, duration: Duration) -> Result<(), TimerError> {
        if duration.is_zero() {
            return Err(TimerError::ZeroDuration);
        }

        let mut expiry = self.expiry.lock().await;
        cancel_expiry(expiry.take()).await;

        let generation = {
            let mut state = self.state.lock().await;
            if state.status == TimerStatus::Running || state.status == TimerStatus::Paused {
                info!("Replacing active countdown");
            }
            state.begin(duration, Instant::now());
            state.generation
        };

        *expiry = Some(self.spawn_expiry(duration, generation));
        info!("Countdown started for {}s", duration.as_secs());
        Ok(())
    }

    pub async fn pause(&self) -> Result<(), TimerError> {
        let mut expiry = self.expiry.lock().await;
        {
            let mut state = self.state.lock().await;
            if state.status != TimerStatus::Running {
                return Err(TimerError::NotRunning);
            }
            state.pause(Instant::now());
        }
        cancel_expiry(expiry.take()).await;
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), TimerError> {
        let mut expiry = self.expiry.lock().await;
        let (remaining, generation) = {
            let mut state = self.state.lock().await;
            if state.status != TimerStatus::Paused {
                return Err(TimerError::NotPaused);
            }
            let now = Instant::now();
            state.resume(now);
            (state.remaining(now), state.generation)
        };
        *expiry = Some(self.spawn_expiry(remaining, generation));
        Ok(())
    }

    /// Stops any countdown without firing. Cancelling an idle timer is a no-op.
    pub async fn cancel(&self) {
        let mut expiry = self.expiry.lock().await;
        self.state.lock().await.cancel();
        cancel_expiry(expiry.take()).await;
    }

    fn spawn_expiry(&self, after: Duration, generation: u64) -> ExpiryTask {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let state = self.state.clone();
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    let mut guard = state.lock().await;
                    if guard.generation == generation && guard.status == TimerStatus::Running {
                        guard.expire();
                        events.emit(EngineEvent::TimerExpired);
                        info!("Countdown expired");
                    }
                }
            }
        });

        ExpiryTask {
            handle,
            cancel_token,
        }
    }
}

async fn cancel_expiry(task: Option<ExpiryTask>) {
    if let Some(task) = task {
        task.cancel_token.cancel();
        let _ = task.handle.await;
    }
}
