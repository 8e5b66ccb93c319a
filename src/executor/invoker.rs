//! Routing service methods to their declared executor

use super::{ExecutorRegistry, ServiceScope, work_item};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// One row of a [`TaskTarget`]'s method table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Method name used for dispatch
    pub name: &'static str,
    /// Executor the method runs on; None when the method carries no declaration
    pub executor: Option<&'static str>,
}

impl MethodDescriptor {
    /// A method declared to run on `executor`
    pub const fn task(name: &'static str, executor: &'static str) -> Self {
        Self {
            name,
            executor: Some(executor),
        }
    }

    /// A dispatchable method without an executor declaration
    pub const fn undeclared(name: &'static str) -> Self {
        Self {
            name,
            executor: None,
        }
    }
}

/// A service whose methods can be run as background tasks
///
/// Implementors publish a static method table and dispatch by name. A fresh
/// instance is built from the execution scope for every invocation, so a
/// task never shares state with the caller that submitted it.
#[async_trait]
pub trait TaskTarget: Sized + Send + Sync + 'static {
    /// Name used in errors and logs
    const TARGET: &'static str;

    /// The methods this type exposes and the executor each declares
    fn methods() -> &'static [MethodDescriptor];

    /// Build an instance from the services of `scope`
    fn from_scope(scope: &ServiceScope) -> Result<Self>;

    /// Run `method` with JSON-encoded arguments
    async fn invoke(&self, method: &str, args: serde_json::Value) -> Result<()>;
}

/// Submits [`TaskTarget`] methods to the executor they declare
#[derive(Clone)]
pub struct TaskInvoker {
    registry: Arc<ExecutorRegistry>,
}

impl TaskInvoker {
    /// Create an invoker resolving executors from `registry`
    pub fn new(registry: Arc<ExecutorRegistry>) -> Self {
        Self { registry }
    }

    /// Run `T::method(args)` on the executor the method declares
    ///
    /// Returns once the executor has accepted the work: immediately after
    /// enqueueing for queued executors, after completion for inline ones.
    ///
    /// # Errors
    /// - [`Error::MethodNotFound`] when `T` has no such method
    /// - [`Error::MissingTaskDeclaration`] when the method declares no executor
    /// - [`Error::NoExecutorAvailable`] when the executor cannot be resolved
    /// - [`Error::Serialization`] when `args` cannot be encoded
    /// - whatever the executor returns ([`Error::ShuttingDown`], or the
    ///   method's own error for inline execution)
    pub async fn invoke_background<T, A>(&self, method: &str, args: A) -> Result<()>
    where
        T: TaskTarget,
        A: Serialize,
    {
        let descriptor = T::methods()
            .iter()
            .find(|m| m.name == method)
            .ok_or_else(|| Error::MethodNotFound {
                target: T::TARGET.to_string(),
                method: method.to_string(),
            })?;

        let executor_name = descriptor
            .executor
            .ok_or_else(|| Error::MissingTaskDeclaration {
                target: T::TARGET.to_string(),
                method: method.to_string(),
            })?;

        let executor = self.registry.resolve(executor_name)?;
        let args = serde_json::to_value(args)?;
        let method: &'static str = descriptor.name;

        tracing::debug!(
            target_type = T::TARGET,
            method,
            executor = executor.name(),
            "submitting task"
        );

        executor
            .execute(work_item(move |scope, _cancel| async move {
                let target = T::from_scope(&scope)?;
                target.invoke(method, args).await.inspect_err(|e| {
                    tracing::error!(
                        target_type = T::TARGET,
                        method,
                        scope_id = %scope.id(),
                        error = %e,
                        "task failed"
                    );
                })
            }))
            .await
    }
}
