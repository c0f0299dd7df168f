//! Replication client contract
//!
//! The binlog wire protocol itself is out of scope: the pipeline consumes a
//! client through these traits. [`crate::catalog::MySqlCatalog`] supplies the
//! catalog half for real deployments.

use crate::config::SourceConfig;
use crate::meta::BinlogPosition;
use async_trait::async_trait;
use rowcast_core::{Action, Result};
use serde_json::Value;
use std::sync::Arc;

/// Fixed header shared by every replication event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventHeader {
    /// Event creation time, unix seconds.
    pub timestamp: u32,

    /// Byte offset of the first byte past this event in the current file.
    pub log_pos: u32,

    pub event_size: u32,
}

/// Binlog file rotation notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotateEvent {
    pub next_log_name: String,
    pub position: u32,
}

/// The replication client's view of the table a row event belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,

    /// Column names in current table order.
    pub columns: Vec<String>,
}

/// A batch of row images for one action on one table.
///
/// For updates, rows come in before/after pairs: even index = before image,
/// odd index = after image.
#[derive(Debug, Clone)]
pub struct RowsEvent {
    pub header: EventHeader,
    pub table: TableInfo,
    pub action: Action,
    pub rows: Vec<Vec<Value>>,
}

/// Current column layout of a table as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableColumns {
    pub names: Vec<String>,
    pub types: Vec<i32>,
}

/// Callbacks delivered serially by a replication client connection.
#[async_trait]
pub trait BinlogEventHandler: Send + Sync {
    /// The stream moved to a new binlog file.
    async fn on_rotate(&self, header: Option<&EventHeader>, rotate: &RotateEvent) -> Result<()>;

    /// A DDL statement touched `schema`.`table`.
    async fn on_table_changed(
        &self,
        header: &EventHeader,
        schema: &str,
        table: &str,
    ) -> Result<()>;

    /// Position acknowledgement. A call with `header == None` and
    /// `force == true` is the client's stop sentinel: the stream delivers
    /// nothing past `pos`.
    async fn on_pos_synced(
        &self,
        header: Option<&EventHeader>,
        pos: &BinlogPosition,
        gtid: Option<&str>,
        force: bool,
    ) -> Result<()>;

    /// A batch of row changes.
    async fn on_row(&self, event: &RowsEvent) -> Result<()>;
}

/// One replication session against a MySQL server.
///
/// Implementations register as a replica with the configured server id,
/// log at warning level, and skip the initial dump phase.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReplicationClient: Send + Sync {
    /// Current master binlog position (`SHOW MASTER STATUS`).
    async fn master_position(&self) -> Result<BinlogPosition>;

    /// Current column layout of `schema`.`table`.
    async fn table_columns(&self, schema: &str, table: &str) -> Result<TableColumns>;

    /// Consume the replication stream from `pos`, delivering callbacks to
    /// `handler` one at a time. Returns when the session errors or is closed.
    async fn run_from(
        &self,
        pos: BinlogPosition,
        handler: Arc<dyn BinlogEventHandler>,
    ) -> Result<()>;

    /// Close the session. Idempotent; unblocks [`ReplicationClient::run_from`].
    async fn close(&self);
}

/// Builds replication clients from source configurations.
#[async_trait]
pub trait ReplicationClientFactory: Send + Sync {
    async fn create(&self, config: &SourceConfig) -> Result<Arc<dyn ReplicationClient>>;
}
