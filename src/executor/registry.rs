//! Name-keyed executor lookup

use super::BackgroundExecutor;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Name resolved when a requested executor is not registered
pub const DEFAULT_EXECUTOR: &str = "default";

/// Name the host registers its [`QueuedExecutor`](super::QueuedExecutor) under
pub const QUEUED_EXECUTOR: &str = "queued";

/// Name the host registers its [`InlineExecutor`](super::InlineExecutor) under
pub const INLINE_EXECUTOR: &str = "inline";

/// Registry of executor strategies keyed by name
///
/// Registration is an upsert so executors can be swapped at runtime.
/// Lookups fall back to the [`DEFAULT_EXECUTOR`] entry.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: Mutex<HashMap<String, Arc<dyn BackgroundExecutor>>>,
}

impl ExecutorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor, replacing any executor already under `name`
    pub fn register(&self, name: impl Into<String>, executor: Arc<dyn BackgroundExecutor>) {
        let name = name.into();
        let replaced = self.lock().insert(name.clone(), executor);
        if replaced.is_some() {
            tracing::warn!(executor = %name, "replacing registered executor");
        } else {
            tracing::debug!(executor = %name, "executor registered");
        }
    }

    /// Look up an executor by name, falling back to "default"
    ///
    /// # Errors
    /// [`Error::NoExecutorAvailable`] when neither `name` nor "default" is registered
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn BackgroundExecutor>> {
        let executors = self.lock();
        if let Some(executor) = executors.get(name) {
            return Ok(Arc::clone(executor));
        }

        match executors.get(DEFAULT_EXECUTOR) {
            Some(executor) => {
                tracing::debug!(
                    requested = %name,
                    "executor not registered, using default"
                );
                Ok(Arc::clone(executor))
            }
            None => Err(Error::NoExecutorAvailable {
                name: name.to_string(),
            }),
        }
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn BackgroundExecutor>>> {
        self.executors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
