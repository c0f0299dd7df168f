//! Time-versioned column layout history

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One column-layout observation, applicable to events whose timestamp is
/// strictly greater than `version`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ColumnSnapshot {
    /// Unix-second stamp of the observation. The first snapshot of a history
    /// is stamped 0 so it predates every binlog event.
    pub version: u32,

    /// Column names as they appear in the table.
    pub names: Vec<String>,

    /// Type codes parallel to `names`.
    pub types: Vec<i32>,

    #[serde(skip)]
    pos: HashMap<String, usize>,
}

impl ColumnSnapshot {
    fn new(version: u32, names: Vec<String>, types: Vec<i32>) -> Self {
        let mut snapshot = Self {
            version,
            names,
            types,
            pos: HashMap::new(),
        };
        snapshot.rebuild_index();
        snapshot
    }

    /// Rebuild the name-to-position map, e.g. after deserialization.
    pub(crate) fn rebuild_index(&mut self) {
        self.pos = self
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
    }

    /// Resolve requested column names to positions; `None` when any name is
    /// absent from this snapshot.
    pub fn column_positions(&self, names: &[String]) -> Option<Vec<usize>> {
        names
            .iter()
            .map(|name| self.pos.get(name).copied())
            .collect()
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.pos.get(name).copied()
    }
}

/// Ordered history of column snapshots for one table, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ColumnHistory {
    snapshots: Vec<ColumnSnapshot>,
}

impl ColumnHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[ColumnSnapshot] {
        &self.snapshots
    }

    /// Append a snapshot, keeping the history sorted by version. The sort is
    /// stable: appends are monotone except for the init-time snapshot.
    pub fn add(&mut self, version: u32, names: Vec<String>, types: Vec<i32>) {
        self.snapshots.push(ColumnSnapshot::new(version, names, types));
        self.snapshots.sort_by_key(|snapshot| snapshot.version);
    }

    /// Append only when the layout differs from the last snapshot. An empty
    /// history forces version 0 regardless of `version`, so the initial
    /// layout is selectable for any event timestamp.
    pub fn append_if_changed(&mut self, version: u32, names: Vec<String>, types: Vec<i32>) {
        match self.last() {
            Some(last) if last.names == names && last.types == types => {}
            Some(_) => self.add(version, names, types),
            None => self.add(0, names, types),
        }
    }

    pub fn last(&self) -> Option<&ColumnSnapshot> {
        self.snapshots.last()
    }

    /// Column names of the most recent snapshot.
    pub fn last_names(&self) -> Option<&[String]> {
        self.last().map(|snapshot| snapshot.names.as_slice())
    }

    /// Type codes of the most recent snapshot.
    pub fn last_types(&self) -> Option<&[i32]> {
        self.last().map(|snapshot| snapshot.types.as_slice())
    }

    /// The snapshot applicable to an event stamped `timestamp`: the most
    /// recent one whose version is strictly less.
    pub fn snapshot_at(&self, timestamp: u32) -> Option<&ColumnSnapshot> {
        self.snapshots
            .iter()
            .rev()
            .find(|snapshot| snapshot.version < timestamp)
    }

    /// Version of the snapshot applicable at `timestamp`, 0 when none
    /// qualifies.
    pub fn version_for(&self, timestamp: u32) -> u32 {
        self.snapshot_at(timestamp)
            .map(|snapshot| snapshot.version)
            .unwrap_or(0)
    }

    pub(crate) fn rebuild_indexes(&mut self) {
        for snapshot in &mut self.snapshots {
            snapshot.rebuild_index();
        }
    }
}
