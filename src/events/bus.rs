//! Process-wide publish/subscribe hub.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::event::Event;

/// Identifier handed out by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct BusInner {
    subscribers: Mutex<HashMap<SubscriptionId, mpsc::Sender<Event>>>,
    next_id: AtomicU64,
    reloading: AtomicBool,
}

/// Event bus shared by every subsystem of the supervisor.
///
/// Each subscriber owns a bounded inbound queue and hands the sending half to
/// the bus. Publishing awaits room in every queue, so a slow subscriber
/// pushes back on the publisher instead of dropping events.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                reloading: AtomicBool::new(false),
            }),
        }
    }

    /// Register a subscriber queue. Every event published afterwards is
    /// delivered to it until [`EventBus::unsubscribe`] is called.
    pub fn subscribe(&self, tx: mpsc::Sender<Event>) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers().insert(id, tx);
        tracing::debug!(subscription = %id, "bus: subscriber registered");
        id
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.subscribers().remove(&id).is_some();
        if removed {
            tracing::debug!(subscription = %id, "bus: subscriber removed");
        }
        removed
    }

    /// Deliver an event to every subscriber.
    ///
    /// Subscribers whose queue has been closed are skipped.
    pub async fn publish(&self, event: Event) {
        let targets: Vec<(SubscriptionId, mpsc::Sender<Event>)> = self
            .subscribers()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        for (id, tx) in targets {
            if tx.send(event.clone()).await.is_err() {
                tracing::debug!(subscription = %id, event = %event, "bus: subscriber queue closed");
            }
        }
    }

    /// Broadcast [`Event::GlobalShutdown`].
    pub async fn shutdown(&self) {
        tracing::debug!("bus: publishing global shutdown");
        self.publish(Event::GlobalShutdown).await;
    }

    /// Mark the upcoming shutdown as a reload rather than an exit.
    pub fn set_reload_flag(&self) {
        self.inner.reloading.store(true, Ordering::SeqCst);
    }

    /// Whether [`EventBus::set_reload_flag`] has been called.
    pub fn is_reloading(&self) -> bool {
        self.inner.reloading.load(Ordering::SeqCst)
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    fn subscribers(&self) -> std::sync::MutexGuard<'_, HashMap<SubscriptionId, mpsc::Sender<Event>>> {
        self.inner.subscribers.lock().expect("event bus mutex poisoned")
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("reloading", &self.is_reloading())
            .finish()
    }
}
