//! Source configuration for MySQL CDC

use rowcast_core::{Action, Result, RowcastError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;

/// Top-level settings for a CDC deployment, loadable through
/// [`rowcast_shared::config::load`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CdcSettings {
    /// Directory holding the meta checkpoint file.
    pub meta_dir: String,

    /// One entry per upstream MySQL server.
    pub sources: Vec<SourceConfig>,
}

/// Configuration of one MySQL source.
///
/// Every field is optional at the serde layer; [`SourceConfig::normalize`]
/// applies defaults and reports what is actually missing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceConfig {
    /// Replica server id registered with the master. Nonzero, unique within
    /// a coordinator.
    #[serde(default)]
    pub server_id: u32,

    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Checkpoint interval in seconds.
    #[serde(default)]
    pub sync_interval_secs: u64,

    /// Schemas to capture, keyed by the name row events are matched against.
    #[serde(default)]
    pub schemas: HashMap<String, SchemaConfig>,
}

impl SourceConfig {
    /// Validate and canonicalize in place. Must run before the config is
    /// handed to a consumer.
    pub fn normalize(&mut self) -> Result<()> {
        if self.port == 0 {
            self.port = DEFAULT_MYSQL_PORT;
        }
        if self.sync_interval_secs == 0 {
            self.sync_interval_secs = DEFAULT_SYNC_INTERVAL_SECS;
        }
        if self.server_id == 0 {
            return Err(RowcastError::Config("source server_id not set".to_string()));
        }
        if self.username.is_empty() {
            return Err(RowcastError::Config("source username not set".to_string()));
        }
        for (name, schema) in &mut self.schemas {
            schema.normalize(name)?;
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }
}

/// Capture rules for one schema.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchemaConfig {
    /// Upstream database name.
    #[serde(default)]
    pub db: String,

    /// Source-configured name; set to the map key during normalization.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Events stamped at or before this unix-second floor are ignored.
    #[serde(default)]
    pub first_start: u32,

    /// Tables to capture, keyed by table name.
    #[serde(default)]
    pub tables: HashMap<String, TableActions>,
}

impl SchemaConfig {
    fn normalize(&mut self, name: &str) -> Result<()> {
        if self.db.is_empty() {
            return Err(RowcastError::Config(format!("schema {name} db not set")));
        }
        if self.tables.is_empty() {
            return Err(RowcastError::Config(format!("schema {name} has no tables")));
        }
        self.name = name.to_string();
        for actions in self.tables.values_mut() {
            actions.normalize();
        }
        Ok(())
    }

    /// Configured column list for one table and action.
    pub fn columns(&self, table: &str, action: Action) -> Option<&[String]> {
        self.tables.get(table)?.columns(action)
    }
}

/// Per-table action filter: which row operations to capture, and which
/// columns to project for each. An empty column list projects every column
/// of the applicable snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct TableActions(HashMap<Action, Vec<String>>);

impl TableActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace the column list for an action. The list is stored sorted and
    /// deduplicated.
    pub fn set(&mut self, action: Action, mut columns: Vec<String>) {
        columns.sort();
        columns.dedup();
        self.0.insert(action, columns);
    }

    /// Add columns to an action, keeping the stored list sorted and
    /// deduplicated.
    pub fn appends<I, S>(&mut self, action: Action, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = self.0.entry(action).or_default();
        list.extend(columns.into_iter().map(Into::into));
        list.sort();
        list.dedup();
    }

    pub fn contains_action(&self, action: Action) -> bool {
        self.0.contains_key(&action)
    }

    pub fn contains_column(&self, action: Action, column: &str) -> bool {
        self.columns(action)
            .is_some_and(|columns| columns.iter().any(|c| c == column))
    }

    /// The configured column list for an action; `None` when the action is
    /// not captured.
    pub fn columns(&self, action: Action) -> Option<&[String]> {
        self.0.get(&action).map(Vec::as_slice)
    }

    /// An empty filter means "everything": expand it to all three actions
    /// with the all-columns sentinel; otherwise canonicalize each list.
    fn normalize(&mut self) {
        if self.0.is_empty() {
            for action in [Action::Insert, Action::Update, Action::Delete] {
                self.0.insert(action, Vec::new());
            }
        } else {
            for columns in self.0.values_mut() {
                columns.sort();
                columns.dedup();
            }
        }
    }
}
