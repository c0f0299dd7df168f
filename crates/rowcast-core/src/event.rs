//! Change event model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::RowcastError;

/// Reserved column name attached to update rows, carrying the list of
/// columns whose value changed between the before and after images.
/// Consumers must not derive a user column of this name.
pub const UPDATED_COLUMNS_KEY: &str = "_UPDATES";

/// A projected row: column name to value.
pub type Row = HashMap<String, serde_json::Value>;

/// Row-level operations captured from the replication stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Insert,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Insert => "insert",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = RowcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(Action::Insert),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(RowcastError::Config(format!(
                "unrecognized action {other}"
            ))),
        }
    }
}

/// A filtered, projected change captured from one table.
///
/// `data` holds one map per surviving row. Update events may carry the
/// reserved [`UPDATED_COLUMNS_KEY`] entry listing the columns that changed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChangeEvent {
    /// Source-configured schema name.
    pub schema: String,
    pub table: String,
    pub action: Action,
    pub data: Vec<Row>,
}

impl ChangeEvent {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        action: Action,
        data: Vec<Row>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            action,
            data,
        }
    }
}
