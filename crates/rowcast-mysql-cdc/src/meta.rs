//! Durable per-server replication state

use crate::column::ColumnHistory;
use rowcast_core::Result;
use rowcast_shared::PipelineMetrics;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const META_FILE: &str = "meta.json";

/// Binlog coordinates: file name plus byte offset within it.
///
/// Serialized with `Name`/`Pos` keys for compatibility with existing meta
/// files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct BinlogPosition {
    pub name: String,
    pub pos: u32,
}

impl BinlogPosition {
    pub fn new(name: impl Into<String>, pos: u32) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }
}

/// Column histories for every tracked table of one schema.
pub type TableHistories = HashMap<String, ColumnHistory>;

/// Replication progress and schema knowledge for one server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceMeta {
    pub position: BinlogPosition,

    pub schema: HashMap<String, TableHistories>,

    /// Unix-second stamp of the last applied row event.
    pub timestamp: u32,
}

impl SourceMeta {
    /// Column history for (schema, table), creating the nested entries.
    pub fn histories_mut(&mut self, schema: &str, table: &str) -> &mut ColumnHistory {
        self.schema
            .entry(schema.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default()
    }

    pub fn histories(&self, schema: &str, table: &str) -> Option<&ColumnHistory> {
        self.schema.get(schema)?.get(table)
    }

    fn rebuild_indexes(&mut self) {
        for tables in self.schema.values_mut() {
            for history in tables.values_mut() {
                history.rebuild_indexes();
            }
        }
    }
}

/// Shared handle to one server's meta. Extractor callbacks and checkpoint
/// reads serialize through the inner mutex; critical sections never await.
pub type SharedMeta = Arc<Mutex<SourceMeta>>;

/// The durable map of server id to meta, backed by `<dir>/meta.json`.
#[derive(Debug)]
pub struct MetaStore {
    inner: Mutex<HashMap<u32, SharedMeta>>,
    path: PathBuf,
}

impl MetaStore {
    /// Load the store from `dir`. A missing file yields an empty store; a
    /// malformed one is an error.
    pub fn init(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(META_FILE);
        let mut metas = HashMap::new();
        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let decoded: HashMap<u32, SourceMeta> = serde_json::from_str(&raw)?;
            for (server_id, mut meta) in decoded {
                meta.rebuild_indexes();
                metas.insert(server_id, Arc::new(Mutex::new(meta)));
            }
        }
        Ok(Self {
            inner: Mutex::new(metas),
            path,
        })
    }

    /// Fetch the meta for a server, creating (and immediately persisting) a
    /// fresh one on first encounter.
    pub fn get_or_create(&self, server_id: u32) -> SharedMeta {
        let (meta, created) = {
            let mut metas = self.inner.lock().unwrap();
            match metas.get(&server_id) {
                Some(meta) => (meta.clone(), false),
                None => {
                    let meta: SharedMeta = Arc::new(Mutex::new(SourceMeta::default()));
                    metas.insert(server_id, meta.clone());
                    (meta, true)
                }
            }
        };
        if created {
            self.save();
        }
        meta
    }

    pub fn get(&self, server_id: u32) -> Option<SharedMeta> {
        self.inner.lock().unwrap().get(&server_id).cloned()
    }

    /// Persist the whole map, replacing the meta file atomically.
    ///
    /// Persistence is best-effort: errors are counted and logged, never
    /// propagated.
    pub fn save(&self) {
        let metas = self.inner.lock().unwrap();
        let snapshot: BTreeMap<u32, SourceMeta> = metas
            .iter()
            .map(|(server_id, meta)| (*server_id, meta.lock().unwrap().clone()))
            .collect();

        match self.write_snapshot(&snapshot) {
            Ok(()) => {
                PipelineMetrics::checkpoint_saved();
                debug!(path = %self.path.display(), "meta checkpoint saved");
            }
            Err(error) => {
                PipelineMetrics::checkpoint_failed();
                warn!(path = %self.path.display(), error = %error, "meta checkpoint failed");
            }
        }
    }

    fn write_snapshot(&self, snapshot: &BTreeMap<u32, SourceMeta>) -> Result<()> {
        let encoded = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &encoded)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
