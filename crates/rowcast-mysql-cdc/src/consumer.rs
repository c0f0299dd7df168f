//! Consumer lifecycle and the multi-source coordinator

use crate::client::ReplicationClientFactory;
use crate::config::SourceConfig;
use crate::handler::SourceHandler;
use crate::meta::MetaStore;
use rowcast_core::{EventReceiver, Result, RowcastError};
use rowcast_shared::RunState;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::info;

/// One generation of sources: the meta store plus one handler per server.
///
/// A consumer is never restarted; reloading builds a fresh generation and
/// retires this one.
pub struct Consumer {
    handlers: HashMap<u32, SourceHandler>,
    store: Arc<MetaStore>,
    state: RunState,
    shutdown: watch::Sender<bool>,
}

impl Consumer {
    /// Load the meta store from `dir` and initialize a handler per config.
    /// Any validation, client-construction, or handler-init error aborts the
    /// whole build.
    pub async fn init(
        dir: impl AsRef<Path>,
        configs: Vec<SourceConfig>,
        factory: &dyn ReplicationClientFactory,
    ) -> Result<Self> {
        let store = Arc::new(MetaStore::init(dir)?);
        let mut handlers = HashMap::with_capacity(configs.len());
        for mut config in configs {
            config.normalize()?;
            if handlers.contains_key(&config.server_id) {
                return Err(RowcastError::DuplicateServerId(config.server_id));
            }
            let client = factory.create(&config).await?;
            let meta = store.get_or_create(config.server_id);
            let handler = SourceHandler::init(&config, client, meta, store.clone()).await?;
            handlers.insert(config.server_id, handler);
        }

        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            handlers,
            store,
            state: RunState::new(),
            shutdown,
        })
    }

    /// Start every handler.
    pub fn start(&self) {
        for handler in self.handlers.values() {
            handler.start(self.shutdown.subscribe(), self.state.clone());
        }
        info!(handlers = self.handlers.len(), "consumer started");
    }

    /// True once every handler has exited (or none was started).
    pub fn stopped(&self) -> bool {
        self.state.stopped()
    }

    /// Event channel for one server while the consumer is running.
    pub fn events(&self, server_id: u32) -> Option<EventReceiver> {
        if self.stopped() {
            return None;
        }
        self.handlers.get(&server_id).map(SourceHandler::events)
    }

    /// Signal cancellation, wait until every handler has drained, then take
    /// a final checkpoint.
    pub async fn cancel(&self) {
        let _ = self.shutdown.send(true);
        while !self.stopped() {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        self.store.save();
        info!("consumer stopped");
    }
}

/// Owns the active [`Consumer`] and serializes lifecycle transitions against
/// readers.
pub struct Coordinator {
    active: RwLock<Option<Arc<Consumer>>>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            active: RwLock::new(None),
        }
    }

    /// Build, start, and publish the first consumer. A later call on an
    /// initialized coordinator is a no-op; use [`Coordinator::reload`] to
    /// replace a running consumer.
    pub async fn init(
        &self,
        dir: impl AsRef<Path>,
        configs: Vec<SourceConfig>,
        factory: &dyn ReplicationClientFactory,
    ) -> Result<()> {
        let mut active = self.active.write().await;
        if active.is_some() {
            return Ok(());
        }
        let consumer = Consumer::init(dir, configs, factory).await?;
        consumer.start();
        *active = Some(Arc::new(consumer));
        Ok(())
    }

    /// Atomically replace the running consumer.
    ///
    /// The replacement is fully constructed before anything is touched: on
    /// construction failure the running consumer keeps serving untouched. On
    /// success the old consumer is cancelled and drained under the write
    /// lock, then the new one starts in its place.
    pub async fn reload(
        &self,
        dir: impl AsRef<Path>,
        configs: Vec<SourceConfig>,
        factory: &dyn ReplicationClientFactory,
    ) -> Result<()> {
        if self.active.read().await.is_none() {
            return Err(RowcastError::Uninitialized);
        }

        let consumer = Consumer::init(dir, configs, factory).await?;

        let mut active = self.active.write().await;
        if let Some(previous) = active.take() {
            previous.cancel().await;
        }
        consumer.start();
        *active = Some(Arc::new(consumer));
        info!("consumer reloaded");
        Ok(())
    }

    /// Event channel for `server_id` on the running consumer, if any.
    pub async fn events(&self, server_id: u32) -> Option<EventReceiver> {
        let consumer = self.active.read().await.clone()?;
        consumer.events(server_id)
    }

    /// True when no consumer is running or every handler has exited.
    pub async fn stopped(&self) -> bool {
        match self.active.read().await.as_ref() {
            Some(consumer) => consumer.stopped(),
            None => true,
        }
    }

    /// Cancel the running consumer and wait for it to drain. Safe to call
    /// repeatedly; readers block until the drain completes.
    pub async fn cancel(&self) {
        let active = self.active.write().await;
        if let Some(consumer) = active.as_ref() {
            consumer.cancel().await;
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}
