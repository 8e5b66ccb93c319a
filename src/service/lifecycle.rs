//! Startup and shutdown coordination.

use super::CourseSync;
use crate::error::{Error, Result};
use crate::executor::QueueConsumerLoop;
use crate::types::Event;

impl CourseSync {
    /// Spawn the queue consumer loop
    ///
    /// Calling it again while the loop runs does nothing.
    ///
    /// # Errors
    /// [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown)
    pub async fn start(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::ShuttingDown);
        }

        let mut consumer = self.consumer.lock().await;
        if consumer.is_some() {
            tracing::warn!("queue consumer loop already running");
            return Ok(());
        }

        let handle = QueueConsumerLoop::new(
            self.queue.clone(),
            self.provider.clone(),
            self.event_tx.clone(),
        )
        .spawn(self.cancel.clone());
        *consumer = Some(handle);

        tracing::info!(executors = ?self.registry.names(), "course sync host started");
        Ok(())
    }

    /// Gracefully shut down
    ///
    /// 1. Closes the queue so producers get [`Error::ShuttingDown`]
    /// 2. Cancels the consumer loop, which stops between items
    /// 3. Waits up to `queue.shutdown_grace` for the running item
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// Items still queued are dropped; queued work is not persisted.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("initiating graceful shutdown");

        self.queue.close();
        self.cancel.cancel();

        let dropped = self.queue.len();
        if dropped > 0 {
            tracing::warn!(dropped, "dropping queued work items");
        }

        let handle = self.consumer.lock().await.take();
        if let Some(handle) = handle {
            let grace = self.config.queue.shutdown_grace;
            match tokio::time::timeout(grace, handle).await {
                Ok(Ok(processed)) => {
                    tracing::info!(processed, "queue consumer loop stopped");
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "queue consumer loop panicked");
                }
                Err(_) => {
                    tracing::warn!(
                        grace_ms = grace.as_millis() as u64,
                        "timeout waiting for the running work item, proceeding with shutdown"
                    );
                }
            }
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("graceful shutdown complete");
        Ok(())
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let sync = self.clone();
        tokio::spawn(async move { crate::api::start_api_server(sync).await })
    }
}
