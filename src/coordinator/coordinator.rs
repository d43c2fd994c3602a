use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::coordinator::state::{PendingCall, QueuedReply, RefreshState};
use crate::error::AuthError;
use crate::events::bus::AuthEventBus;
use crate::events::event::AuthEvent;
use crate::observability::metrics::{get_metrics, try_metrics};
use crate::store::token_store::TokenStore;
use crate::transport::authenticating::AuthenticatingTransport;
use crate::transport::refresh::RefreshTransport;
use crate::transport::request::RequestDescriptor;

static OK_MSG: &str = "ok";
static ERROR_MSG: &str = "error";
static ABANDONED_MSG: &str = "abandoned";
static REJECTED_MSG: &str = "rejected";

/// What the transport should do with a call that failed authentication
pub(crate) enum Admission {
    /// the store already holds a newer token than the one sent; re-send now
    Replay(RequestDescriptor),
    /// parked until the in-flight refresh resolves
    Queued(QueuedReply),
}

/// Single-flight token refresh with a FIFO queue of suspended callers.
///
/// `Idle -> Refreshing` and every enqueue happen inside one critical section;
/// the lock is never held across an await.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    /// bumped whenever a refresh writes the store, before it goes back to `Idle`
    epoch: AtomicU64,
    refresher: RefreshTransport,
    store: Arc<dyn TokenStore>,
    events: AuthEventBus,
}

impl RefreshCoordinator {
    pub fn new(refresher: RefreshTransport, store: Arc<dyn TokenStore>, events: AuthEventBus) -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle),
            epoch: AtomicU64::new(0),
            refresher,
            store,
            events,
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock_state(), RefreshState::Refreshing { .. })
    }

    /// Callers currently parked behind the in-flight refresh
    pub fn queued(&self) -> usize {
        self.lock_state().queued()
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Enqueue a call that failed authentication, starting a refresh if none is in flight.
    pub(crate) fn admit(
        self: &Arc<Self>,
        transport: &AuthenticatingTransport,
        request: RequestDescriptor,
    ) -> Admission {
        loop {
            // the store may hit the disk, so it is read outside the critical section
            let epoch = self.epoch.load(Ordering::Acquire);
            let current = self.store.get().map(|pair| pair.access_token);

            let mut state = self.lock_state();

            if let RefreshState::Refreshing { queue } = &mut *state {
                let (pending, queued) = PendingCall::new(request);
                queue.push_back(pending);
                debug!(queued = queue.len(), "refresh in flight, call queued");
                if let Some(metrics) = try_metrics() {
                    metrics.queued_calls.inc();
                }
                return Admission::Queued(queued);
            }

            if self.epoch.load(Ordering::Acquire) != epoch {
                debug!("refresh resolved while reading the store, retrying admission");
                continue;
            }

            if current.is_some() && current != request.sent_with {
                debug!("token changed since the call was sent, replaying without refresh");
                return Admission::Replay(request);
            }

            let (pending, queued) = PendingCall::new(request);
            *state = RefreshState::Refreshing { queue: VecDeque::from([pending]) };
            drop(state);

            if let Some(metrics) = try_metrics() {
                metrics.queued_calls.inc();
            }
            info!("authentication failed, starting token refresh");
            tokio::spawn(self.clone().run_refresh(transport.clone(), current));
            return Admission::Queued(queued);
        }
    }

    async fn run_refresh(self: Arc<Self>, transport: AuthenticatingTransport, token: Option<String>) {
        let metrics = get_metrics().await;

        match self.refresher.refresh(token.as_deref()).await {
            Ok(session) => {
                self.store.set(&session.pair);
                self.epoch.fetch_add(1, Ordering::Release);
                let queue = self.finish();
                info!(queued = queue.len(), "token refreshed, replaying queued calls");
                self.events.emit(&AuthEvent::Refreshed {
                    access_token: session.pair.access_token.clone(),
                });

                // the wait for the refresh is over for every caller still there;
                // from here each replay is bounded by its own request timeout
                let mut released = Vec::with_capacity(queue.len());
                for pending in queue {
                    match pending.release() {
                        Some(call) => released.push(call),
                        None => {
                            debug!("queued caller gone, skipping replay");
                            metrics.replayed_calls.with_label_values(&[ABANDONED_MSG]).inc();
                        }
                    }
                }

                // FIFO: each replay completes before the next is sent
                for (request, reply) in released {
                    let result = transport.replay(request).await;
                    let outcome = if result.is_ok() { OK_MSG } else { ERROR_MSG };
                    metrics.replayed_calls.with_label_values(&[outcome]).inc();
                    let _ = reply.send(result);
                }
            }
            Err(failure) => {
                self.store.clear();
                self.epoch.fetch_add(1, Ordering::Release);
                let queue = self.finish();
                warn!(queued = queue.len(), "token refresh failed, session cleared: {}", failure);
                self.events.emit(&AuthEvent::Unauthorized);

                for pending in queue {
                    metrics.replayed_calls.with_label_values(&[REJECTED_MSG]).inc();
                    let _ = pending.reply.send(Err(AuthError::RefreshFailure(failure.clone())));
                }
            }
        }
    }

    /// `Refreshing -> Idle`, taking the queue in the same critical section
    fn finish(&self) -> VecDeque<PendingCall> {
        let queue = self.lock_state().finish();
        if let Some(metrics) = try_metrics() {
            metrics.queued_calls.sub(queue.len() as i64);
        }
        queue
    }
}
