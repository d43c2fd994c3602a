use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::AuthError;
use crate::transport::request::RequestDescriptor;
use crate::transport::response::Response;

pub(crate) type Reply = Result<Response, AuthError>;

/// A caller suspended behind a refresh. Consuming `reply` resolves it exactly once.
pub(crate) struct PendingCall {
    pub request: RequestDescriptor,
    /// fired when the refresh resolves and the call leaves the queue
    released: oneshot::Sender<()>,
    pub reply: oneshot::Sender<Reply>,
}

/// Caller side of a [`PendingCall`]
pub(crate) struct QueuedReply {
    released: oneshot::Receiver<()>,
    reply: oneshot::Receiver<Reply>,
}

impl PendingCall {
    pub fn new(request: RequestDescriptor) -> (Self, QueuedReply) {
        let (released, released_rx) = oneshot::channel();
        let (reply, reply_rx) = oneshot::channel();
        (
            Self { request, released, reply },
            QueuedReply { released: released_rx, reply: reply_rx },
        )
    }

    /// Stop the caller's queue timer. `None` when the caller already gave up;
    /// such a call must not be re-sent.
    pub fn release(self) -> Option<(RequestDescriptor, oneshot::Sender<Reply>)> {
        match self.released.send(()) {
            Ok(()) => Some((self.request, self.reply)),
            Err(()) => None,
        }
    }
}

impl QueuedReply {
    /// `queue_timeout` bounds the wait for the refresh only. Once released, the
    /// replay's own request timeout governs.
    pub async fn wait(mut self, queue_timeout: Duration) -> Reply {
        if tokio::time::timeout(queue_timeout, &mut self.released).await.is_err() {
            // after close() a release can no longer land; one that landed before still counts
            self.released.close();
            if self.released.try_recv().is_err() {
                return match self.reply.try_recv() {
                    Ok(reply) => reply,
                    Err(_) => Err(AuthError::Timeout(queue_timeout)),
                };
            }
        }
        self.reply.await.unwrap_or(Err(AuthError::Abandoned))
    }
}

/// The queue exists only while a refresh is in flight
#[derive(Default)]
pub(crate) enum RefreshState {
    #[default]
    Idle,
    Refreshing { queue: VecDeque<PendingCall> },
}

impl RefreshState {
    pub fn queued(&self) -> usize {
        match self {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { queue } => queue.len(),
        }
    }

    /// Back to `Idle`, handing over whatever was queued
    pub fn finish(&mut self) -> VecDeque<PendingCall> {
        match std::mem::take(self) {
            RefreshState::Idle => VecDeque::new(),
            RefreshState::Refreshing { queue } => queue,
        }
    }
}
