//! Scripted replication doubles shared by handler and consumer tests.

use crate::client::{
    BinlogEventHandler, ReplicationClient, ReplicationClientFactory, RowsEvent, TableColumns,
};
use crate::config::SourceConfig;
use crate::meta::BinlogPosition;
use async_trait::async_trait;
use rowcast_core::{Result, RowcastError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// A client that feeds a fixed list of row events into the handler, then
/// parks until closed.
pub(crate) struct ScriptedClient {
    position: BinlogPosition,
    columns: TableColumns,
    rows: Mutex<Vec<RowsEvent>>,
    closed: watch::Sender<bool>,
}

impl ScriptedClient {
    pub(crate) fn new(position: BinlogPosition, columns: TableColumns) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            position,
            columns,
            rows: Mutex::new(Vec::new()),
            closed,
        }
    }

    pub(crate) fn with_rows(self, rows: Vec<RowsEvent>) -> Self {
        *self.rows.lock().unwrap() = rows;
        self
    }

    pub(crate) fn default_columns() -> TableColumns {
        TableColumns {
            names: vec!["id".to_string(), "v".to_string()],
            types: vec![1, 5],
        }
    }
}

#[async_trait]
impl ReplicationClient for ScriptedClient {
    async fn master_position(&self) -> Result<BinlogPosition> {
        Ok(self.position.clone())
    }

    async fn table_columns(&self, _schema: &str, _table: &str) -> Result<TableColumns> {
        Ok(self.columns.clone())
    }

    async fn run_from(
        &self,
        _pos: BinlogPosition,
        handler: Arc<dyn BinlogEventHandler>,
    ) -> Result<()> {
        let rows = std::mem::take(&mut *self.rows.lock().unwrap());
        for event in rows {
            handler.on_row(&event).await?;
        }
        let mut closed = self.closed.subscribe();
        let _ = closed.wait_for(|closed| *closed).await;
        Ok(())
    }

    async fn close(&self) {
        let _ = self.closed.send(true);
    }
}

/// Builds a fresh [`ScriptedClient`] per source; configurable to refuse
/// specific server ids.
#[derive(Default)]
pub(crate) struct ScriptedFactory {
    refuse: HashSet<u32>,
}

impl ScriptedFactory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn refusing(server_ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            refuse: server_ids.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ReplicationClientFactory for ScriptedFactory {
    async fn create(&self, config: &SourceConfig) -> Result<Arc<dyn ReplicationClient>> {
        if self.refuse.contains(&config.server_id) {
            return Err(RowcastError::Client(format!(
                "addr[{}]: connection refused",
                config.addr()
            )));
        }
        Ok(Arc::new(ScriptedClient::new(
            BinlogPosition::new("mysql-bin.000001", 154),
            ScriptedClient::default_columns(),
        )))
    }
}
