use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::HookError;

use super::{ClickEvent, ClickHook};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ObserverStatus {
    Active,
    Stopped,
}

/// Bridges a [`ClickHook`] to an async handler.
///
/// While active, hook events are queued on an unbounded channel and a single dispatcher task
/// feeds them to the handler one at a time, in arrival order. The hook owns the only sender,
/// so detaching it closes the channel and the dispatcher exits once the queue is empty.
pub struct InputObserver {
    hook: Arc<dyn ClickHook>,
    dispatcher: Option<JoinHandle<()>>,
}

impl InputObserver {
    pub fn new(hook: Arc<dyn ClickHook>) -> Self {
        Self {
            hook,
            dispatcher: None,
        }
    }

    pub fn status(&self) -> ObserverStatus {
        if self.dispatcher.is_some() {
            ObserverStatus::Active
        } else {
            ObserverStatus::Stopped
        }
    }

    /// Attaches the hook and starts dispatching. Does nothing if already active.
    pub fn activate<F, Fut>(&mut self, mut handler: F) -> Result<(), HookError>
    where
        F: FnMut(ClickEvent) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.dispatcher.is_some() {
            return Ok(());
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<ClickEvent>();
        self.hook.attach(tx)?;

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handler(event).await;
            }
        });

        self.dispatcher = Some(handle);
        log_info!("input observer active ({} hook)", self.hook.name());
        Ok(())
    }

    /// Detaches the hook, lets the dispatcher finish every event already queued, and waits
    /// for it to exit.
    ///
    /// Once this returns the handler will not be invoked again.
    pub async fn deactivate(&mut self) {
        self.hook.detach();

        if let Some(handle) = self.dispatcher.take() {
            if let Err(err) = handle.await {
                log_warn!("input dispatcher ended abnormally: {}", err);
            }
            log_info!("input observer stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::SyntheticClickHook;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn forwards_in_order_while_active() {
        let hook = Arc::new(SyntheticClickHook::new());
        let mut observer = InputObserver::new(hook.clone());
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

        observer
            .activate(move |event: ClickEvent| {
                let seen_tx = seen_tx.clone();
                async move {
                    let _ = seen_tx.send(event.x);
                }
            })
            .unwrap();
        assert_eq!(observer.status(), ObserverStatus::Active);

        for x in 0..5 {
            assert!(hook.inject(ClickEvent::left(x, 0)));
        }
        let mut received = Vec::new();
        for _ in 0..5 {
            received.push(seen_rx.recv().await.unwrap());
        }
        assert_eq!(received, vec![0, 1, 2, 3, 4]);

        observer.deactivate().await;
    }

    #[tokio::test]
    async fn no_handler_calls_after_deactivate() {
        let hook = Arc::new(SyntheticClickHook::new());
        let mut observer = InputObserver::new(hook.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        observer
            .activate(move |_event: ClickEvent| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();

        observer.deactivate().await;
        assert_eq!(observer.status(), ObserverStatus::Stopped);
        assert!(!hook.is_attached());

        let before = calls.load(Ordering::SeqCst);
        assert!(!hook.inject(ClickEvent::left(1, 1)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn queued_events_are_handled_before_deactivate_returns() {
        let hook = Arc::new(SyntheticClickHook::new());
        let mut observer = InputObserver::new(hook.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        observer
            .activate(move |_event: ClickEvent| {
                let counter = counter.clone();
                async move {
                    tokio::task::yield_now().await;
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();

        for x in 0..8 {
            assert!(hook.inject(ClickEvent::left(x, 0)));
        }
        observer.deactivate().await;
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn activate_twice_is_a_noop() {
        let hook = Arc::new(SyntheticClickHook::new());
        let mut observer = InputObserver::new(hook);
        observer.activate(|_event: ClickEvent| async {}).unwrap();
        observer.activate(|_event: ClickEvent| async {}).unwrap();
        assert_eq!(observer.status(), ObserverStatus::Active);
        observer.deactivate().await;
    }
}
