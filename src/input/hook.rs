use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::error::HookError;

use super::ClickEvent;

pub type ClickSender = mpsc::UnboundedSender<ClickEvent>;

/// A source of process-wide pointer presses.
///
/// `attach` hands the hook the channel to forward into; `detach` must guarantee that nothing
/// is forwarded once it returns. Forwarding never blocks the caller.
pub trait ClickHook: Send + Sync {
    fn attach(&self, sink: ClickSender) -> Result<(), HookError>;
    fn detach(&self);
    fn name(&self) -> &'static str;
}

/// The channel a hook currently forwards into, if any.
#[derive(Debug, Default)]
pub(crate) struct SinkSlot {
    sink: Mutex<Option<ClickSender>>,
}

impl SinkSlot {
    pub(crate) fn attach(&self, sink: ClickSender) -> Result<(), HookError> {
        let mut slot = self.sink.lock().unwrap_or_else(|p| p.into_inner());
        if slot.as_ref().is_some_and(|existing| !existing.is_closed()) {
            return Err(HookError::AlreadyAttached);
        }
        *slot = Some(sink);
        Ok(())
    }

    pub(crate) fn detach(&self) {
        self.sink.lock().unwrap_or_else(|p| p.into_inner()).take();
    }

    /// Returns false when no sink is attached or the receiver is gone.
    pub(crate) fn forward(&self, event: ClickEvent) -> bool {
        let slot = self.sink.lock().unwrap_or_else(|p| p.into_inner());
        match slot.as_ref() {
            Some(sink) => sink.send(event).is_ok(),
            None => false,
        }
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }
}

/// Hook fed by the host instead of the operating system.
#[derive(Debug, Default)]
pub struct SyntheticClickHook {
    slot: SinkSlot,
}

impl SyntheticClickHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` as if the OS had reported it. Returns false while detached.
    pub fn inject(&self, event: ClickEvent) -> bool {
        self.slot.forward(event)
    }

    pub fn is_attached(&self) -> bool {
        self.slot.is_attached()
    }
}

impl ClickHook for SyntheticClickHook {
    fn attach(&self, sink: ClickSender) -> Result<(), HookError> {
        self.slot.attach(sink)
    }

    fn detach(&self) {
        self.slot.detach();
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
