//! Executor that runs work on the caller's task

use super::{BackgroundExecutor, ServiceProvider, WorkItem};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs each item immediately in a fresh scope and returns its result
pub struct InlineExecutor {
    name: String,
    provider: Arc<ServiceProvider>,
}

impl InlineExecutor {
    /// Create an inline executor creating scopes from `provider`
    pub fn new(name: impl Into<String>, provider: Arc<ServiceProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }
}

#[async_trait]
impl BackgroundExecutor for InlineExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, item: WorkItem) -> Result<()> {
        let scope = self.provider.create_scope();
        let scope_id = scope.id();
        tracing::debug!(executor = %self.name, scope_id = %scope_id, "running work item inline");

        let result = item(scope, CancellationToken::new()).await;
        if let Err(e) = &result {
            tracing::warn!(
                executor = %self.name,
                scope_id = %scope_id,
                error = %e,
                "inline work item failed"
            );
        }
        result
    }
}
