//! Durable delivery of backend mutations.
//!
//! `submit` is attempt-then-fallback: the mutation is tried against the
//! backend immediately and captured in the store's sync queue when the
//! backend is unreachable. `flush` replays queued actions strictly in FIFO
//! order and stops at the first failure so a later action is never applied
//! before an earlier one that is still failing.

use tracing::{debug, warn};

use stratus_store::Store;
use stratus_types::QueueMethod;

use crate::backend::BackendClient;

/// Outcome of [`Outbox::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The backend acknowledged the mutation synchronously.
    Delivered,
    /// The backend was unreachable; the mutation is queued under this ID.
    Queued(i64),
}

/// Result of one [`Outbox::flush`] pass over a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Actions acknowledged and dequeued this pass.
    pub delivered: usize,
    /// Actions still queued after this pass.
    pub remaining: usize,
}

/// Attempt-then-fallback delivery of mutations through a backend client.
pub struct Outbox {
    backend: Box<dyn BackendClient>,
}

impl Outbox {
    /// Create an outbox over a backend client.
    pub fn new(backend: Box<dyn BackendClient>) -> Self {
        Self { backend }
    }

    /// Submit a mutation: deliver now if possible, queue otherwise.
    ///
    /// Backend failure is not an error from the caller's view; it degrades
    /// to a [`SubmitOutcome::Queued`] result. Only a store failure during
    /// the fallback propagates.
    pub async fn submit(
        &self,
        store: &Store,
        queue_name: &str,
        method: QueueMethod,
        data: serde_json::Value,
    ) -> stratus_store::Result<SubmitOutcome> {
        match self.backend.deliver(queue_name, method, &data).await {
            Ok(()) => {
                debug!("Delivered {} to '{}' synchronously", method, queue_name);
                Ok(SubmitOutcome::Delivered)
            }
            Err(e) => {
                warn!("Backend unreachable for '{}': {}; queueing", queue_name, e);
                let id = store.enqueue(queue_name, method, &data)?;
                Ok(SubmitOutcome::Queued(id))
            }
        }
    }

    /// Replay queued actions for one queue, oldest first.
    ///
    /// Dequeues each action only after the backend acknowledges it. The
    /// first failure ends the pass; everything behind the failing action
    /// stays queued for the next attempt. Individual replay failures never
    /// propagate as errors.
    pub async fn flush(&self, store: &Store, queue_name: &str) -> stratus_store::Result<FlushReport> {
        let actions = store.list_queued(queue_name)?;
        let total = actions.len();
        let mut delivered = 0;

        for action in actions {
            match self
                .backend
                .deliver(queue_name, action.method, &action.data)
                .await
            {
                Ok(()) => {
                    store.dequeue(action.id)?;
                    delivered += 1;
                }
                Err(e) => {
                    warn!(
                        "Replay of action {} on '{}' failed: {}; {} left for next attempt",
                        action.id,
                        queue_name,
                        e,
                        total - delivered
                    );
                    break;
                }
            }
        }

        Ok(FlushReport {
            delivered,
            remaining: total - delivered,
        })
    }
}
