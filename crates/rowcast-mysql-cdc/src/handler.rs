//! Per-source replication driver

use crate::client::ReplicationClient;
use crate::config::SourceConfig;
use crate::extractor::Extractor;
use crate::meta::{MetaStore, SharedMeta};
use chrono::Utc;
use rowcast_core::{EventReceiver, Result, RowcastError};
use rowcast_shared::RunState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant};
use tracing::{error, info};

/// Drives one replication session: owns the client, the outbound event
/// channel, the checkpoint ticker, and the installed extractor.
pub struct SourceHandler {
    server_id: u32,
    sync_interval: Duration,
    client: Arc<dyn ReplicationClient>,
    meta: SharedMeta,
    store: Arc<MetaStore>,
    extractor: Arc<Extractor>,
    events: EventReceiver,
}

impl SourceHandler {
    /// Construct and initialize a handler for one source.
    ///
    /// Bootstraps the replication position when the meta has none (only the
    /// master log file name is stored; the byte offset stays 0), seeds the
    /// column history of every configured table, and wires the extractor to
    /// a fresh bounded event channel.
    pub async fn init(
        config: &SourceConfig,
        client: Arc<dyn ReplicationClient>,
        meta: SharedMeta,
        store: Arc<MetaStore>,
    ) -> Result<Self> {
        Self::init_position(&client, &meta, config).await?;
        Self::init_table_columns(&client, &meta, config).await?;

        let (sender, events) = EventReceiver::channel();
        let extractor = Arc::new(Extractor::new(
            meta.clone(),
            Arc::new(config.schemas.clone()),
            client.clone(),
            store.clone(),
            sender,
        ));

        Ok(Self {
            server_id: config.server_id,
            sync_interval: config.sync_interval(),
            client,
            meta,
            store,
            extractor,
            events,
        })
    }

    async fn init_position(
        client: &Arc<dyn ReplicationClient>,
        meta: &SharedMeta,
        config: &SourceConfig,
    ) -> Result<()> {
        if !meta.lock().unwrap().position.name.is_empty() {
            return Ok(());
        }
        let position = client.master_position().await.map_err(|error| {
            RowcastError::Client(format!(
                "addr[{}]: master position fetch failed: {error}",
                config.addr()
            ))
        })?;
        meta.lock().unwrap().position.name = position.name;
        Ok(())
    }

    async fn init_table_columns(
        client: &Arc<dyn ReplicationClient>,
        meta: &SharedMeta,
        config: &SourceConfig,
    ) -> Result<()> {
        for (name, schema) in &config.schemas {
            for table in schema.tables.keys() {
                let columns = client.table_columns(name, table).await.map_err(|error| {
                    RowcastError::Client(format!(
                        "db[{name}]: table [{table}] schema fetch failed: {error}"
                    ))
                })?;
                if columns.names.is_empty() {
                    return Err(RowcastError::Client(format!(
                        "db[{name}]: table [{table}] schema not found"
                    )));
                }
                let stamp = Utc::now().timestamp() as u32;
                meta.lock()
                    .unwrap()
                    .histories_mut(name, table)
                    .append_if_changed(stamp, columns.names, columns.types);
            }
        }
        Ok(())
    }

    /// Server this handler replicates from.
    pub fn server_id(&self) -> u32 {
        self.server_id
    }

    /// Shared handle to the outbound event channel.
    pub fn events(&self) -> EventReceiver {
        self.events.clone()
    }

    /// Spawn the replication and checkpoint tasks.
    ///
    /// The replication task consumes the stream from the stored position,
    /// closes the event channel when the stream ends, and marks the run
    /// state done. A watcher closes the client on shutdown, which unblocks
    /// the stream; the checkpoint task saves the meta store at every tick.
    pub fn start(&self, shutdown: watch::Receiver<bool>, state: RunState) {
        state.add();
        let server_id = self.server_id;

        let start_position = self.meta.lock().unwrap().position.clone();
        let client = self.client.clone();
        let extractor = self.extractor.clone();
        tokio::spawn(async move {
            let handler: Arc<dyn crate::client::BinlogEventHandler> = extractor.clone();
            if let Err(error) = client.run_from(start_position, handler).await {
                error!(server_id, error = %error, "replication stream terminated");
            }
            extractor.close_channel();
            state.done();
            info!(server_id, "source handler finished");
        });

        let client = self.client.clone();
        let mut cancel = shutdown.clone();
        tokio::spawn(async move {
            if cancel.wait_for(|stop| *stop).await.is_ok() {
                info!(server_id, "cancel signal received");
            }
            client.close().await;
        });

        let store = self.store.clone();
        let mut cancel = shutdown;
        let period = self.sync_interval;
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => store.save(),
                    _ = cancel.wait_for(|stop| *stop) => return,
                }
            }
        });
    }
}
