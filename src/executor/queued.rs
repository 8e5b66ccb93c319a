//! Bounded in-memory queue executor

use super::{BackgroundExecutor, WorkItem};
use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// Executor that enqueues work for the [`QueueConsumerLoop`](super::QueueConsumerLoop)
///
/// The queue holds at most `capacity` items. When it is full, `execute`
/// waits for the consumer to free a slot, so producers slow down instead of
/// losing work. Closing the queue releases waiting producers with
/// [`Error::ShuttingDown`].
pub struct QueuedExecutor {
    name: String,
    capacity: usize,
    sender: mpsc::Sender<WorkItem>,
    receiver: Mutex<mpsc::Receiver<WorkItem>>,
    closed: CancellationToken,
}

impl QueuedExecutor {
    /// Create a queue with room for `capacity` items (at least one)
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            name: name.into(),
            capacity,
            sender,
            receiver: Mutex::new(receiver),
            closed: CancellationToken::new(),
        }
    }

    /// Maximum number of queued items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items waiting to be dequeued
    pub fn len(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    /// True when nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting new items; queued items can still be dequeued
    pub fn close(&self) {
        if !self.closed.is_cancelled() {
            self.closed.cancel();
            tracing::info!(executor = %self.name, pending = self.len(), "queue closed to new work");
        }
    }

    /// True once [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Wait for the next item in FIFO order
    ///
    /// Returns `None` when `cancel` fires first. Meant for the single
    /// consumer loop.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Option<WorkItem> {
        let mut receiver = tokio::select! {
            _ = cancel.cancelled() => return None,
            receiver = self.receiver.lock() => receiver,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            item = receiver.recv() => item,
        }
    }
}

#[async_trait]
impl BackgroundExecutor for QueuedExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, item: WorkItem) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(Error::ShuttingDown);
        }

        if self.sender.capacity() == 0 {
            tracing::debug!(
                executor = %self.name,
                capacity = self.capacity,
                "queue full, waiting for a free slot"
            );
        }

        tokio::select! {
            _ = self.closed.cancelled() => Err(Error::ShuttingDown),
            sent = self.sender.send(item) => {
                sent.map_err(|_| Error::ShuttingDown)?;
                tracing::trace!(executor = %self.name, "work item enqueued");
                Ok(())
            }
        }
    }
}
