//! The long-running loop that drains the queued executor

use super::{QueuedExecutor, ServiceProvider, panic_message};
use crate::error::Error;
use crate::types::Event;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// Sequential consumer for a [`QueuedExecutor`]
///
/// Items run one at a time in FIFO order, each in its own scope and on its
/// own task. A failing or panicking item is logged and reported as
/// [`Event::WorkFailed`]; the loop moves on to the next item. Cancellation
/// is honored between items.
pub struct QueueConsumerLoop {
    queue: Arc<QueuedExecutor>,
    provider: Arc<ServiceProvider>,
    event_tx: broadcast::Sender<Event>,
}

impl QueueConsumerLoop {
    /// Create a loop draining `queue` with scopes from `provider`
    pub fn new(
        queue: Arc<QueuedExecutor>,
        provider: Arc<ServiceProvider>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            queue,
            provider,
            event_tx,
        }
    }

    /// Spawn [`run`](Self::run) onto the runtime
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<u64> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Process items until `cancel` fires; returns how many items ran
    pub async fn run(self, cancel: CancellationToken) -> u64 {
        tracing::info!("queue consumer loop started");
        let mut processed = 0u64;

        while let Some(item) = self.queue.dequeue(&cancel).await {
            let scope = self.provider.create_scope();
            let scope_id = scope.id();
            tracing::debug!(scope_id = %scope_id, "running queued work item");

            let outcome = tokio::spawn(item(scope, cancel.child_token()))
                .await
                .map_err(|e| Error::Other(join_failure(e)))
                .and_then(|result| result);

            match outcome {
                Ok(()) => {
                    self.emit(Event::WorkCompleted { scope: scope_id });
                }
                Err(e) => {
                    tracing::error!(scope_id = %scope_id, error = %e, "queued work item failed");
                    self.emit(Event::WorkFailed {
                        scope: scope_id,
                        error: e.to_string(),
                    });
                }
            }
            processed += 1;
        }

        tracing::info!(processed, "queue consumer loop stopped");
        processed
    }

    fn emit(&self, event: Event) {
        // send() fails only when nobody is subscribed
        self.event_tx.send(event).ok();
    }
}

fn join_failure(e: JoinError) -> String {
    if e.is_panic() {
        format!("work item panicked: {}", panic_message(e.into_panic().as_ref()))
    } else {
        "work item was cancelled".to_string()
    }
}
