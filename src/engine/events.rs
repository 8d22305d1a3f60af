use serde::Serialize;
use tokio::sync::mpsc;

use super::{MilestoneTier, SessionState};

/// Notifications pushed to whoever drives the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EngineEvent {
    CountChanged { count: u64 },
    Milestone { tier: MilestoneTier, count: u64 },
    SessionStateChanged { state: SessionState },
    TimerExpired,
}

/// Sending half of the event stream. Emission never blocks; events sent after the
/// subscriber is gone are discarded.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}
