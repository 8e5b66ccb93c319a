//! The `CourseSync` host
//!
//! Wires the rate-limited client, the executor registry, the task invoker and
//! the sync pipeline together from a [`Config`]. Methods are organized by
//! domain:
//! - this module: construction, accessors and sync requests
//! - [`lifecycle`]: consumer loop start, graceful shutdown, API server

mod lifecycle;

use crate::config::Config;
use crate::credentials::{CredentialStore, SyncCredential};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::executor::{
    DEFAULT_EXECUTOR, ExecutorRegistry, INLINE_EXECUTOR, InlineExecutor, QUEUED_EXECUTOR,
    QueuedExecutor, ServiceProvider, TaskInvoker,
};
use crate::http::RateLimitedClient;
use crate::rate_limiter::FixedWindowLimiter;
use crate::storage::{AttachmentStorage, FsAttachmentStore};
use crate::sync::{
    ContentFactories, ContentSyncPipeline, SyncBoardArgs, SyncDependencies, SyncLocks,
    TrelloClient,
};
use crate::types::{CredentialId, Event};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Collaborators the host application provides
#[derive(Clone)]
pub struct Collaborators {
    /// Credentials and their syncing flag
    pub credentials: Arc<dyn CredentialStore>,
    /// Where created content goes
    pub factories: ContentFactories,
    /// Where downloaded attachments go
    pub storage: Arc<dyn AttachmentStorage>,
}

/// Background sync host (cloneable, all fields are shared)
#[derive(Clone)]
pub struct CourseSync {
    pub(crate) config: Arc<Config>,
    pub(crate) event_tx: broadcast::Sender<Event>,
    pub(crate) registry: Arc<ExecutorRegistry>,
    pub(crate) queue: Arc<QueuedExecutor>,
    pub(crate) provider: Arc<ServiceProvider>,
    pub(crate) invoker: TaskInvoker,
    pub(crate) credentials: Arc<dyn CredentialStore>,
    pub(crate) locks: SyncLocks,
    pub(crate) cancel: CancellationToken,
    pub(crate) consumer: Arc<Mutex<Option<JoinHandle<u64>>>>,
}

impl CourseSync {
    /// Build a host from configuration and collaborators
    ///
    /// Registers the queued executor under "queued" and "default" and the
    /// inline executor under "inline". Nothing runs until [`start`](Self::start).
    pub fn new(config: Config, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let limiter = FixedWindowLimiter::new(config.rate_limit.clone());
        let client = RateLimitedClient::new(&config.http, config.retry.clone(), limiter)?;
        let trello = TrelloClient::new(client, &config.trello);
        let locks = SyncLocks::new();

        let deps = SyncDependencies {
            trello,
            credentials: collaborators.credentials.clone(),
            factories: collaborators.factories,
            storage: collaborators.storage,
            locks: locks.clone(),
            event_tx: event_tx.clone(),
        };
        let provider = ServiceProvider::builder().singleton(deps).build();

        let queue = Arc::new(QueuedExecutor::new(QUEUED_EXECUTOR, config.queue.capacity));
        let inline = Arc::new(InlineExecutor::new(INLINE_EXECUTOR, provider.clone()));

        let registry = Arc::new(ExecutorRegistry::new());
        registry.register(QUEUED_EXECUTOR, queue.clone());
        registry.register(INLINE_EXECUTOR, inline);
        registry.register(DEFAULT_EXECUTOR, queue.clone());

        tracing::info!(
            queue_capacity = config.queue.capacity,
            permits = config.rate_limit.permits,
            window_ms = config.rate_limit.window.as_millis() as u64,
            "course sync host created"
        );

        Ok(Self {
            config: Arc::new(config),
            event_tx,
            invoker: TaskInvoker::new(registry.clone()),
            registry,
            queue,
            provider,
            credentials: collaborators.credentials,
            locks,
            cancel: CancellationToken::new(),
            consumer: Arc::new(Mutex::new(None)),
        })
    }

    /// Build a host backed by the credential database and filesystem storage
    ///
    /// Syncing flags left set by a previous process are cleared first, since
    /// queued work does not survive a restart.
    pub async fn with_database(
        config: Config,
        database: Arc<Database>,
        factories: ContentFactories,
    ) -> Result<Self> {
        database.reset_stale_sync_flags().await?;
        let storage = FsAttachmentStore::new(config.storage.attachment_dir.clone());

        Self::new(
            config,
            Collaborators {
                credentials: database,
                factories,
                storage: Arc::new(storage),
            },
        )
    }

    /// Subscribe to executor and sync events
    ///
    /// Each subscriber receives every event; a subscriber more than 1000
    /// events behind gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The task invoker bound to this host's registry
    pub fn invoker(&self) -> &TaskInvoker {
        &self.invoker
    }

    /// The executor registry, for registering more strategies
    pub fn registry(&self) -> &Arc<ExecutorRegistry> {
        &self.registry
    }

    /// The current configuration
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Items waiting in the background queue
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Look up a credential and its syncing flag
    pub async fn credential(&self, id: CredentialId) -> Result<SyncCredential> {
        self.credentials.get(id).await
    }

    /// Queue a board import for `credential_id`
    ///
    /// Returns once the work is enqueued. Rejects up front a credential that
    /// is unknown or already syncing; the pipeline re-checks when it runs.
    ///
    /// # Errors
    /// [`Error::CredentialNotFound`], [`Error::SyncInProgress`],
    /// [`Error::ShuttingDown`]
    pub async fn request_sync(
        &self,
        credential_id: CredentialId,
        board_id: impl Into<String>,
    ) -> Result<()> {
        self.ensure_idle(credential_id).await?;

        let board_id = board_id.into();
        tracing::info!(credential_id = %credential_id, board_id = %board_id, "queueing board sync");

        self.invoker
            .invoke_background::<ContentSyncPipeline, _>(
                "sync_board",
                SyncBoardArgs {
                    credential_id,
                    board_id,
                },
            )
            .await
    }

    /// Import a board on the caller's task and wait for it to finish
    pub async fn sync_now(
        &self,
        credential_id: CredentialId,
        board_id: impl Into<String>,
    ) -> Result<()> {
        self.invoker
            .invoke_background::<ContentSyncPipeline, _>(
                "sync_board_now",
                SyncBoardArgs {
                    credential_id,
                    board_id: board_id.into(),
                },
            )
            .await
    }

    async fn ensure_idle(&self, credential_id: CredentialId) -> Result<()> {
        let credential = self.credentials.get(credential_id).await?;
        if credential.syncing || self.locks.is_held(credential_id) {
            return Err(Error::SyncInProgress(credential_id));
        }
        Ok(())
    }

    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers
        self.event_tx.send(event).ok();
    }
}
