use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use tokio::sync::broadcast::{Receiver, Sender};
use tracing::{debug, error};

use crate::events::event::AuthEvent;
use crate::observability::metrics::try_metrics;
use crate::utils::channel;

type Listener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
    channel: OnceLock<Sender<AuthEvent>>,
}

/// In-memory fan-out of auth lifecycle events.
///
/// Delivery is synchronous and in subscription order. A panicking listener is
/// logged and skipped; the remaining listeners still run.
#[derive(Clone, Default)]
pub struct AuthEventBus {
    inner: Arc<BusInner>,
}

/// Handle returned by [`AuthEventBus::subscribe`].
///
/// Dropping it keeps the listener registered; call [`Subscription::unsubscribe`].
#[must_use = "keep the handle if the listener ever needs to be removed"]
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(inner) = self.bus.upgrade() {
            inner
                .listeners
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .retain(|(id, _)| *id != self.id);
            debug!(subscription = self.id, "listener unsubscribed");
        }
    }
}

impl AuthEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, Arc::new(listener)));
        debug!(subscription = id, "listener subscribed");
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Async consumers: every event emitted after this call is also broadcast.
    /// Slow receivers lag and lose events; there is no replay.
    pub fn subscribe_channel(&self) -> Receiver<AuthEvent> {
        self.inner
            .channel
            .get_or_init(|| {
                let sender = channel::run();
                let forward = sender.clone();
                // forwarding listener lives as long as the bus
                let _ = self.subscribe(move |event| {
                    let _ = forward.send(event.clone());
                });
                sender
            })
            .subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn emit(&self, event: &AuthEvent) {
        // snapshot so listeners may (un)subscribe without deadlocking
        let listeners: Vec<(u64, Listener)> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        debug!(event = event.name(), listeners = listeners.len(), "emitting auth event");
        if let Some(metrics) = try_metrics() {
            metrics.events_emitted.with_label_values(&[event.name()]).inc();
        }

        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!(subscription = id, event = event.name(), "auth event listener panicked");
                if let Some(metrics) = try_metrics() {
                    metrics.listener_panics.inc();
                }
            }
        }
    }
}
