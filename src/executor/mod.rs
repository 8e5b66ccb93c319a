//! Background task execution
//!
//! Work is submitted to a [`BackgroundExecutor`] chosen by name from the
//! [`ExecutorRegistry`]. Two strategies exist:
//!
//! - [`QueuedExecutor`]: a bounded FIFO drained by a single
//!   [`QueueConsumerLoop`]; submission returns once the item is enqueued.
//! - [`InlineExecutor`]: runs the item on the caller's task and returns its
//!   result.
//!
//! Either way the item runs inside a fresh [`ServiceScope`]. The
//! [`TaskInvoker`] sits on top and routes a method of a [`TaskTarget`] to the
//! executor the method declares.

mod consumer;
mod inline;
mod invoker;
mod queued;
mod registry;
mod scope;

pub use consumer::QueueConsumerLoop;
pub use inline::InlineExecutor;
pub use invoker::{MethodDescriptor, TaskInvoker, TaskTarget};
pub use queued::QueuedExecutor;
pub use registry::{DEFAULT_EXECUTOR, ExecutorRegistry, INLINE_EXECUTOR, QUEUED_EXECUTOR};
pub use scope::{ServiceProvider, ServiceProviderBuilder, ServiceScope};

use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// A deferred unit of work, run once inside the scope it is handed
pub type WorkItem =
    Box<dyn FnOnce(ServiceScope, CancellationToken) -> BoxFuture<'static, Result<()>> + Send>;

/// Box an async closure into a [`WorkItem`]
pub fn work_item<F, Fut>(f: F) -> WorkItem
where
    F: FnOnce(ServiceScope, CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Box::new(move |scope, cancel| Box::pin(f(scope, cancel)))
}

/// Text of a panic payload, for logs and failure events
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Strategy for running a [`WorkItem`]
#[async_trait]
pub trait BackgroundExecutor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Accept a work item
    ///
    /// Queued strategies return once the item is accepted; inline strategies
    /// return once it has finished, with its error.
    async fn execute(&self, item: WorkItem) -> Result<()>;
}
