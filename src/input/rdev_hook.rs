//! Global mouse hook backed by `rdev`.
//!
//! `rdev::listen` blocks its thread forever and offers no way to unregister, so one listener
//! thread is spawned per process on first attach and lives until exit. Attaching and
//! detaching only swap the channel that thread forwards into.

use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

use rdev::{listen, Button, EventType};

use crate::error::HookError;

use super::hook::{ClickHook, ClickSender, SinkSlot};
use super::{ClickEvent, MouseButton};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

static LISTENER: OnceLock<Result<Arc<SinkSlot>, String>> = OnceLock::new();

pub struct RdevClickHook;

impl RdevClickHook {
    pub fn new() -> Self {
        Self
    }

    fn shared_slot() -> Result<Arc<SinkSlot>, HookError> {
        LISTENER
            .get_or_init(spawn_listener)
            .clone()
            .map_err(HookError::Unavailable)
    }
}

impl Default for RdevClickHook {
    fn default() -> Self {
        Self::new()
    }
}

impl ClickHook for RdevClickHook {
    fn attach(&self, sink: ClickSender) -> Result<(), HookError> {
        Self::shared_slot()?.attach(sink)
    }

    fn detach(&self) {
        if let Some(Ok(slot)) = LISTENER.get() {
            slot.detach();
        }
    }

    fn name(&self) -> &'static str {
        "rdev"
    }
}

fn spawn_listener() -> Result<Arc<SinkSlot>, String> {
    let slot = Arc::new(SinkSlot::default());
    let thread_slot = Arc::clone(&slot);

    thread::Builder::new()
        .name("clicktally-input".into())
        .spawn(move || {
            // Button events carry no coordinates; remember the last pointer position.
            let position = Mutex::new((0.0_f64, 0.0_f64));
            log_info!("global mouse listener started");
            let result = listen(move |event| match event.event_type {
                EventType::MouseMove { x, y } => {
                    *position.lock().unwrap_or_else(|p| p.into_inner()) = (x, y);
                }
                EventType::ButtonPress(button) => {
                    let (x, y) = *position.lock().unwrap_or_else(|p| p.into_inner());
                    let click = ClickEvent::new(x.round() as i32, y.round() as i32, map_button(button));
                    thread_slot.forward(click);
                }
                _ => {}
            });
            if let Err(err) = result {
                log_error!("global mouse listener stopped: {:?}", err);
            }
        })
        .map_err(|err| format!("failed to spawn input thread: {err}"))?;

    Ok(slot)
}

fn map_button(button: Button) -> MouseButton {
    match button {
        Button::Left => MouseButton::Left,
        Button::Right => MouseButton::Right,
        Button::Middle => MouseButton::Middle,
        Button::Unknown(_) => MouseButton::Other,
    }
}
