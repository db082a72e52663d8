//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP) once per process
//! - Translate signals to events on the current generation's bus
//! - Trigger appropriate actions (shutdown, reload)
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - One forwarder lives for the whole process; generations attach and
//!   detach their bus, so a signal between generations is not lost
//! - Every signal is published as `Event::Signal` before it is acted on
//! - Multiple SIGTERM/SIGINT triggers forced shutdown
//! - SIGHUP triggers config reload, not exit

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

use crate::events::{Event, EventBus};
use crate::lifecycle::shutdown::{Shutdown, ShutdownSignal};

/// What the supervisor does with a received signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    Shutdown,
    Reload,
}

/// Apply a signal to the bus.
pub async fn dispatch(bus: &EventBus, name: &str, action: SignalAction) {
    tracing::info!(signal = name, ?action, "signal received");
    bus.publish(Event::Signal(name.to_string())).await;
    if action == SignalAction::Reload {
        bus.set_reload_flag();
    }
    bus.shutdown().await;
}

#[derive(Debug, Default)]
struct RouterInner {
    bus: Mutex<Option<EventBus>>,
    stop: Shutdown,
    forced: Shutdown,
    shutdowns: AtomicU32,
}

/// Routes process signals to whichever bus is current.
///
/// Shutdown requests are remembered even when no bus is attached; the
/// second one also fires [`SignalRouter::forced`].
#[derive(Debug, Clone, Default)]
pub struct SignalRouter {
    inner: Arc<RouterInner>,
}

impl SignalRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `bus` the target of subsequent signals.
    pub fn attach(&self, bus: EventBus) {
        *self.current() = Some(bus);
    }

    /// Stop delivering to the current bus.
    pub fn detach(&self) {
        self.current().take();
    }

    /// Whether SIGINT/SIGTERM has been received.
    pub fn stop_requested(&self) -> bool {
        self.inner.stop.is_triggered()
    }

    /// Resolves once SIGINT/SIGTERM has been received.
    pub fn stopped(&self) -> ShutdownSignal {
        self.inner.stop.subscribe()
    }

    /// Resolves once a second SIGINT/SIGTERM has been received.
    pub fn forced(&self) -> ShutdownSignal {
        self.inner.forced.subscribe()
    }

    /// Record a signal and apply it to the attached bus, if any.
    pub async fn deliver(&self, name: &str, action: SignalAction) {
        if action == SignalAction::Shutdown {
            let seen = self.inner.shutdowns.fetch_add(1, Ordering::SeqCst) + 1;
            if seen > 1 {
                tracing::warn!(signal = name, seen, "repeated shutdown signal, forcing exit");
                self.inner.forced.trigger();
            }
            self.inner.stop.trigger();
        }

        let bus = self.current().clone();
        match bus {
            Some(bus) => dispatch(&bus, name, action).await,
            None => tracing::info!(signal = name, ?action, "signal received between generations"),
        }
    }

    fn current(&self) -> std::sync::MutexGuard<'_, Option<EventBus>> {
        // Poisoning only means a holder panicked; the slot is still usable.
        self.inner.bus.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Spawn a task forwarding every SIGINT/SIGTERM/SIGHUP to `router`.
///
/// Install it once, before the first generation; it runs until aborted.
pub fn forward_signals(router: SignalRouter) -> std::io::Result<JoinHandle<()>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        loop {
            let (name, action) = tokio::select! {
                Some(_) = sigint.recv() => ("SIGINT", SignalAction::Shutdown),
                Some(_) = sigterm.recv() => ("SIGTERM", SignalAction::Shutdown),
                Some(_) = sighup.recv() => ("SIGHUP", SignalAction::Reload),
                else => break,
            };
            router.deliver(name, action).await;
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_reload_signal() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::channel(4);
        bus.subscribe(tx);

        dispatch(&bus, "SIGHUP", SignalAction::Reload).await;

        assert!(bus.is_reloading());
        assert_eq!(rx.recv().await, Some(Event::Signal("SIGHUP".into())));
        assert_eq!(rx.recv().await, Some(Event::GlobalShutdown));
    }

    #[tokio::test]
    async fn test_shutdown_signal() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::channel(4);
        bus.subscribe(tx);

        dispatch(&bus, "SIGTERM", SignalAction::Shutdown).await;

        assert!(!bus.is_reloading());
        assert_eq!(rx.recv().await, Some(Event::Signal("SIGTERM".into())));
        assert_eq!(rx.recv().await, Some(Event::GlobalShutdown));
    }

    #[tokio::test]
    async fn test_repeated_signals_reach_bus() {
        let router = SignalRouter::new();
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::channel(8);
        bus.subscribe(tx);
        router.attach(bus);

        router.deliver("SIGHUP", SignalAction::Reload).await;
        router.deliver("SIGHUP", SignalAction::Reload).await;

        for _ in 0..2 {
            assert_eq!(rx.recv().await, Some(Event::Signal("SIGHUP".into())));
            assert_eq!(rx.recv().await, Some(Event::GlobalShutdown));
        }
        assert!(!router.stop_requested());
    }

    #[tokio::test]
    async fn test_signal_follows_attached_generation() {
        let router = SignalRouter::new();

        let first = EventBus::new();
        let (first_tx, mut first_rx) = mpsc::channel(8);
        first.subscribe(first_tx);
        router.attach(first);
        router.deliver("SIGHUP", SignalAction::Reload).await;
        router.detach();

        let second = EventBus::new();
        let (second_tx, mut second_rx) = mpsc::channel(8);
        second.subscribe(second_tx);
        router.attach(second.clone());
        router.deliver("SIGTERM", SignalAction::Shutdown).await;

        assert_eq!(first_rx.recv().await, Some(Event::Signal("SIGHUP".into())));
        assert_eq!(first_rx.recv().await, Some(Event::GlobalShutdown));
        assert!(first_rx.try_recv().is_err());

        assert_eq!(second_rx.recv().await, Some(Event::Signal("SIGTERM".into())));
        assert_eq!(second_rx.recv().await, Some(Event::GlobalShutdown));
        assert!(!second.is_reloading());
    }

    #[tokio::test]
    async fn test_shutdown_between_generations_is_remembered() {
        let router = SignalRouter::new();
        let mut stopped = router.stopped();

        router.deliver("SIGTERM", SignalAction::Shutdown).await;

        assert!(router.stop_requested());
        timeout(Duration::from_millis(100), stopped.wait())
            .await
            .expect("stop request is sticky");
    }

    #[tokio::test]
    async fn test_second_shutdown_signal_forces_exit() {
        let router = SignalRouter::new();
        let bus = EventBus::new();
        router.attach(bus);
        let mut forced = router.forced();

        router.deliver("SIGINT", SignalAction::Shutdown).await;
        assert!(timeout(Duration::from_millis(50), forced.wait()).await.is_err());

        router.deliver("SIGINT", SignalAction::Shutdown).await;
        timeout(Duration::from_millis(100), forced.wait())
            .await
            .expect("second shutdown signal forces exit");
    }
}
