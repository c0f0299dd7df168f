//! Binlog event extraction: filter, project, diff, emit

use crate::client::{
    BinlogEventHandler, EventHeader, ReplicationClient, RotateEvent, RowsEvent,
};
use crate::config::SchemaConfig;
use crate::meta::{BinlogPosition, MetaStore, SharedMeta};
use async_trait::async_trait;
use rowcast_core::{Action, ChangeEvent, Result, Row, UPDATED_COLUMNS_KEY};
use rowcast_shared::PipelineMetrics;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Per-source event handler installed into the replication client.
///
/// Maintains replication progress in the shared meta, tracks column-layout
/// evolution across DDL, and turns raw row events into projected
/// [`ChangeEvent`]s on the outbound channel. The client invokes callbacks
/// serially, so per-event state needs no coordination beyond the meta mutex
/// shared with the checkpoint path.
pub struct Extractor {
    meta: SharedMeta,
    schemas: Arc<HashMap<String, SchemaConfig>>,
    client: Arc<dyn ReplicationClient>,
    store: Arc<MetaStore>,
    out: Mutex<Option<mpsc::Sender<ChangeEvent>>>,
    stopped: AtomicBool,
}

impl Extractor {
    pub(crate) fn new(
        meta: SharedMeta,
        schemas: Arc<HashMap<String, SchemaConfig>>,
        client: Arc<dyn ReplicationClient>,
        store: Arc<MetaStore>,
        out: mpsc::Sender<ChangeEvent>,
    ) -> Self {
        Self {
            meta,
            schemas,
            client,
            store,
            out: Mutex::new(Some(out)),
            stopped: AtomicBool::new(false),
        }
    }

    /// Whether the client's stop sentinel has been observed.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Drop the outbound sender so readers observe end-of-stream.
    pub(crate) fn close_channel(&self) {
        self.out.lock().unwrap().take();
    }

    fn sender(&self) -> Option<mpsc::Sender<ChangeEvent>> {
        self.out.lock().unwrap().clone()
    }

    /// Run the admission checks for a row event. On success, returns the
    /// projected column names and their positions in the selected snapshot.
    fn check(&self, event: &RowsEvent) -> Option<(Vec<String>, Vec<usize>)> {
        let header = &event.header;
        let event_time = header.timestamp;

        {
            let meta = self.meta.lock().unwrap();
            if self.is_stopped()
                && meta.position.pos <= header.log_pos.saturating_sub(header.event_size)
            {
                return None;
            }
            if meta.timestamp > 0 && event_time < meta.timestamp {
                warn!(
                    event_time,
                    progress = meta.timestamp,
                    "event predates sync progress, skipping"
                );
                PipelineMetrics::event_dropped("stale");
                return None;
            }
        }

        let schema_name = &event.table.schema;
        let table_name = &event.table.name;
        let schema = self.schemas.get(schema_name)?;
        let actions = schema.tables.get(table_name)?;
        if !actions.contains_action(event.action) || event.rows.is_empty() {
            return None;
        }

        if event_time <= schema.first_start {
            debug!(
                event_time,
                first_start = schema.first_start,
                schema = %schema_name,
                "event predates schema start, skipping"
            );
            PipelineMetrics::event_dropped("before_first_start");
            return None;
        }
        if event.rows[0].len() != event.table.columns.len() {
            warn!(
                row_width = event.rows[0].len(),
                table_width = event.table.columns.len(),
                schema = %schema_name,
                table = %table_name,
                "row width does not match the current table layout, skipping"
            );
            PipelineMetrics::event_dropped("width_mismatch");
            return None;
        }

        let meta = self.meta.lock().unwrap();
        let Some(history) = meta.histories(schema_name, table_name) else {
            warn!(schema = %schema_name, table = %table_name, "column history not found, skipping");
            PipelineMetrics::event_dropped("missing_history");
            return None;
        };
        let Some(snapshot) = history.snapshot_at(event_time) else {
            warn!(
                event_time,
                schema = %schema_name,
                table = %table_name,
                "no column snapshot predates the event, skipping"
            );
            PipelineMetrics::event_dropped("missing_snapshot");
            return None;
        };

        let configured = actions.columns(event.action).unwrap_or(&[]);
        if configured.is_empty() {
            // the all-columns sentinel: project the snapshot as-is
            Some((snapshot.names.clone(), (0..snapshot.names.len()).collect()))
        } else {
            match snapshot.column_positions(configured) {
                Some(positions) => Some((configured.to_vec(), positions)),
                None => {
                    warn!(
                        required = ?configured,
                        available = ?snapshot.names,
                        "required columns missing from snapshot, skipping"
                    );
                    PipelineMetrics::event_dropped("missing_columns");
                    None
                }
            }
        }
    }

    fn project(row: &[serde_json::Value], names: &[String], positions: &[usize]) -> Row {
        let mut projected = Row::with_capacity(names.len());
        for (name, position) in names.iter().zip(positions) {
            // a snapshot older than the live layout can point past the row
            let value = row.get(*position).cloned().unwrap_or(serde_json::Value::Null);
            projected.insert(name.clone(), value);
        }
        projected
    }
}

#[async_trait]
impl BinlogEventHandler for Extractor {
    async fn on_rotate(&self, _header: Option<&EventHeader>, rotate: &RotateEvent) -> Result<()> {
        {
            let mut meta = self.meta.lock().unwrap();
            meta.position = BinlogPosition::new(rotate.next_log_name.clone(), rotate.position);
        }
        info!(file = %rotate.next_log_name, pos = rotate.position, "binlog rotated");
        self.store.save();
        Ok(())
    }

    async fn on_table_changed(
        &self,
        header: &EventHeader,
        schema: &str,
        table: &str,
    ) -> Result<()> {
        let outdated = {
            let meta = self.meta.lock().unwrap();
            meta.histories(schema, table)
                .and_then(|history| history.last())
                .is_some_and(|last| last.version < header.timestamp)
        };
        if !outdated {
            return Ok(());
        }

        match self.client.table_columns(schema, table).await {
            Ok(columns) => {
                {
                    let mut meta = self.meta.lock().unwrap();
                    meta.histories_mut(schema, table).append_if_changed(
                        header.timestamp,
                        columns.names,
                        columns.types,
                    );
                }
                info!(schema, table, version = header.timestamp, "table layout refreshed");
                self.store.save();
            }
            Err(error) => {
                // the next DDL event retries
                debug!(schema, table, error = %error, "table column fetch failed");
            }
        }
        Ok(())
    }

    async fn on_pos_synced(
        &self,
        header: Option<&EventHeader>,
        pos: &BinlogPosition,
        _gtid: Option<&str>,
        force: bool,
    ) -> Result<()> {
        if header.is_none() && force {
            {
                let mut meta = self.meta.lock().unwrap();
                meta.position = pos.clone();
            }
            self.stopped.store(true, Ordering::SeqCst);
            info!(file = %pos.name, pos = pos.pos, "replication stream stop acknowledged");
            self.store.save();
        }
        Ok(())
    }

    async fn on_row(&self, event: &RowsEvent) -> Result<()> {
        if let Some((col_names, col_positions)) = self.check(event) {
            // updates arrive as before/after pairs; an unchanged pair leaves
            // a trailing tombstone that the next before-image overwrites
            let mut data: Vec<Option<Row>> = Vec::with_capacity(event.rows.len());
            for (i, row) in event.rows.iter().enumerate() {
                let projected = Self::project(row, &col_names, &col_positions);

                if event.action == Action::Update {
                    if i % 2 == 0 {
                        match data.last_mut() {
                            Some(slot) if slot.is_none() => *slot = Some(projected),
                            _ => data.push(Some(projected)),
                        }
                    } else if let Some(slot) = data.last_mut() {
                        match slot.take() {
                            Some(before) if before == projected => {}
                            Some(before) => {
                                let changed: Vec<&String> = col_names
                                    .iter()
                                    .filter(|name| before.get(*name) != projected.get(*name))
                                    .collect();
                                let mut after = projected;
                                after.insert(UPDATED_COLUMNS_KEY.to_string(), json!(changed));
                                *slot = Some(after);
                            }
                            None => *slot = Some(projected),
                        }
                    }
                } else {
                    data.push(Some(projected));
                }
            }

            if matches!(data.last(), Some(None)) {
                data.pop();
            }
            let data: Vec<Row> = data.into_iter().flatten().collect();

            if data.is_empty() {
                info!(
                    schema = %event.table.schema,
                    table = %event.table.name,
                    action = %event.action,
                    "event has no surviving rows"
                );
                PipelineMetrics::event_dropped("empty_after_diff");
            } else if !self.is_stopped() {
                {
                    let mut meta = self.meta.lock().unwrap();
                    meta.position.pos = event.header.log_pos;
                }
                if let Some(sender) = self.sender() {
                    let change = ChangeEvent::new(
                        event.table.schema.clone(),
                        event.table.name.clone(),
                        event.action,
                        data,
                    );
                    if sender.send(change).await.is_ok() {
                        PipelineMetrics::event_emitted(event.action.as_str());
                    } else {
                        warn!(
                            schema = %event.table.schema,
                            table = %event.table.name,
                            "event channel closed, dropping event"
                        );
                    }
                }
            }
        }

        if !self.is_stopped() {
            let mut meta = self.meta.lock().unwrap();
            if event.header.timestamp > meta.timestamp {
                meta.timestamp = event.header.timestamp;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockReplicationClient, TableColumns, TableInfo};
    use crate::config::{SourceConfig, TableActions};
    use rowcast_core::EventReceiver;
    use serde_json::Value;
    use std::collections::HashMap;

    const LOG_POS: u32 = 2000;
    const EVENT_SIZE: u32 = 100;

    struct Fixture {
        extractor: Arc<Extractor>,
        meta: SharedMeta,
        store: Arc<MetaStore>,
        events: EventReceiver,
        _dir: tempfile::TempDir,
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// Build an extractor for schema `app`, table `users`, with the given
    /// action filter, initial snapshot and schema start floor.
    fn fixture(
        actions: TableActions,
        snapshot: &[&str],
        first_start: u32,
        client: MockReplicationClient,
    ) -> Fixture {
        let mut config: SourceConfig = serde_json::from_value(json!({
            "server_id": 42,
            "host": "db1",
            "username": "repl",
            "schemas": {"app": {"db": "app", "tables": {"users": {}}}}
        }))
        .unwrap();
        config.schemas.get_mut("app").unwrap().first_start = first_start;
        if !actions.is_empty() {
            config
                .schemas
                .get_mut("app")
                .unwrap()
                .tables
                .insert("users".to_string(), actions);
        }
        config.normalize().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MetaStore::init(dir.path()).unwrap());
        let meta = store.get_or_create(config.server_id);
        meta.lock().unwrap().histories_mut("app", "users").add(
            0,
            names(snapshot),
            vec![1; snapshot.len()],
        );

        let (sender, events) = EventReceiver::channel();
        let extractor = Arc::new(Extractor::new(
            meta.clone(),
            Arc::new(config.schemas.clone()),
            Arc::new(client),
            store.clone(),
            sender,
        ));

        Fixture {
            extractor,
            meta,
            store,
            events,
            _dir: dir,
        }
    }

    fn all_actions() -> TableActions {
        TableActions::new()
    }

    fn rows_event(action: Action, ts: u32, columns: &[&str], rows: Vec<Vec<Value>>) -> RowsEvent {
        RowsEvent {
            header: EventHeader {
                timestamp: ts,
                log_pos: LOG_POS,
                event_size: EVENT_SIZE,
            },
            table: TableInfo {
                schema: "app".to_string(),
                name: "users".to_string(),
                columns: names(columns),
            },
            action,
            rows,
        }
    }

    #[tokio::test]
    async fn test_insert_projection() {
        let mut actions = TableActions::new();
        actions.set(Action::Insert, names(&["id", "name"]));
        let fx = fixture(actions, &["id", "name", "age"], 0, MockReplicationClient::new());

        let event = rows_event(
            Action::Insert,
            100,
            &["id", "name", "age"],
            vec![vec![json!(7), json!("alice"), json!(30)]],
        );
        fx.extractor.on_row(&event).await.unwrap();

        let change = fx.events.recv().await.unwrap();
        assert_eq!(change.schema, "app");
        assert_eq!(change.table, "users");
        assert_eq!(change.action, Action::Insert);
        assert_eq!(change.data.len(), 1);
        assert_eq!(change.data[0]["id"], json!(7));
        assert_eq!(change.data[0]["name"], json!("alice"));
        assert!(!change.data[0].contains_key("age"));

        let meta = fx.meta.lock().unwrap();
        assert_eq!(meta.timestamp, 100);
        assert_eq!(meta.position.pos, LOG_POS);
    }

    #[tokio::test]
    async fn test_update_diff_attaches_changed_columns() {
        let fx = fixture(all_actions(), &["id", "v"], 0, MockReplicationClient::new());

        let event = rows_event(
            Action::Update,
            200,
            &["id", "v"],
            vec![vec![json!(1), json!("a")], vec![json!(1), json!("b")]],
        );
        fx.extractor.on_row(&event).await.unwrap();

        let change = fx.events.recv().await.unwrap();
        assert_eq!(change.data.len(), 1);
        let row = &change.data[0];
        assert_eq!(row["id"], json!(1));
        assert_eq!(row["v"], json!("b"));
        assert_eq!(row[UPDATED_COLUMNS_KEY], json!(["v"]));
    }

    #[tokio::test]
    async fn test_updates_key_is_nonempty_subset_of_row_keys() {
        let fx = fixture(all_actions(), &["id", "v"], 0, MockReplicationClient::new());

        let event = rows_event(
            Action::Update,
            200,
            &["id", "v"],
            vec![vec![json!(1), json!("a")], vec![json!(2), json!("b")]],
        );
        fx.extractor.on_row(&event).await.unwrap();

        let change = fx.events.recv().await.unwrap();
        let row = &change.data[0];
        let updated: Vec<String> =
            serde_json::from_value(row[UPDATED_COLUMNS_KEY].clone()).unwrap();
        assert!(!updated.is_empty());
        for column in &updated {
            assert!(row.contains_key(column));
            assert_ne!(column, UPDATED_COLUMNS_KEY);
        }
        assert_eq!(updated.len(), 2);
    }

    #[tokio::test]
    async fn test_unchanged_update_pairs_are_elided() {
        let fx = fixture(all_actions(), &["id", "v"], 0, MockReplicationClient::new());

        let event = rows_event(
            Action::Update,
            200,
            &["id", "v"],
            vec![
                vec![json!(1), json!("a")],
                vec![json!(1), json!("a")],
                vec![json!(2), json!("x")],
                vec![json!(2), json!("y")],
            ],
        );
        fx.extractor.on_row(&event).await.unwrap();

        let change = fx.events.recv().await.unwrap();
        assert_eq!(change.data.len(), 1);
        assert_eq!(change.data[0]["id"], json!(2));
        assert_eq!(change.data[0]["v"], json!("y"));
        assert_eq!(change.data[0][UPDATED_COLUMNS_KEY], json!(["v"]));
    }

    #[tokio::test]
    async fn test_fully_unchanged_update_emits_nothing() {
        let fx = fixture(all_actions(), &["id", "v"], 0, MockReplicationClient::new());

        let event = rows_event(
            Action::Update,
            200,
            &["id", "v"],
            vec![vec![json!(1), json!("a")], vec![json!(1), json!("a")]],
        );
        fx.extractor.on_row(&event).await.unwrap();

        assert!(fx.events.try_recv().is_none());
        // the drop still advances the progress stamp
        assert_eq!(fx.meta.lock().unwrap().timestamp, 200);
        // position is only advanced by emitted events
        assert_eq!(fx.meta.lock().unwrap().position.pos, 0);
    }

    #[tokio::test]
    async fn test_stale_event_is_dropped_without_rewinding_progress() {
        let fx = fixture(all_actions(), &["id", "v"], 0, MockReplicationClient::new());
        fx.meta.lock().unwrap().timestamp = 500;

        let event = rows_event(
            Action::Insert,
            400,
            &["id", "v"],
            vec![vec![json!(1), json!("a")]],
        );
        fx.extractor.on_row(&event).await.unwrap();

        assert!(fx.events.try_recv().is_none());
        assert_eq!(fx.meta.lock().unwrap().timestamp, 500);
    }

    #[tokio::test]
    async fn test_first_start_boundary_is_strict() {
        let fx = fixture(all_actions(), &["id", "v"], 100, MockReplicationClient::new());

        let at_floor = rows_event(
            Action::Insert,
            100,
            &["id", "v"],
            vec![vec![json!(1), json!("a")]],
        );
        fx.extractor.on_row(&at_floor).await.unwrap();
        assert!(fx.events.try_recv().is_none());
        assert_eq!(fx.meta.lock().unwrap().timestamp, 100);

        let past_floor = rows_event(
            Action::Insert,
            101,
            &["id", "v"],
            vec![vec![json!(1), json!("a")]],
        );
        fx.extractor.on_row(&past_floor).await.unwrap();
        assert_eq!(fx.events.recv().await.unwrap().data.len(), 1);
        assert_eq!(fx.meta.lock().unwrap().timestamp, 101);
    }

    #[tokio::test]
    async fn test_width_mismatch_is_dropped() {
        let fx = fixture(all_actions(), &["id", "v"], 0, MockReplicationClient::new());

        let event = rows_event(
            Action::Insert,
            100,
            &["id", "v", "w"],
            vec![vec![json!(1), json!("a")]],
        );
        fx.extractor.on_row(&event).await.unwrap();

        assert!(fx.events.try_recv().is_none());
        assert_eq!(fx.meta.lock().unwrap().timestamp, 100);
    }

    #[tokio::test]
    async fn test_unconfigured_schema_table_and_action_are_dropped() {
        let mut actions = TableActions::new();
        actions.set(Action::Insert, Vec::new());
        let fx = fixture(actions, &["id", "v"], 0, MockReplicationClient::new());

        let mut other_schema = rows_event(
            Action::Insert,
            100,
            &["id", "v"],
            vec![vec![json!(1), json!("a")]],
        );
        other_schema.table.schema = "other".to_string();
        fx.extractor.on_row(&other_schema).await.unwrap();

        let mut other_table = rows_event(
            Action::Insert,
            101,
            &["id", "v"],
            vec![vec![json!(1), json!("a")]],
        );
        other_table.table.name = "orders".to_string();
        fx.extractor.on_row(&other_table).await.unwrap();

        let unconfigured_action = rows_event(
            Action::Delete,
            102,
            &["id", "v"],
            vec![vec![json!(1), json!("a")]],
        );
        fx.extractor.on_row(&unconfigured_action).await.unwrap();

        let empty_rows = rows_event(Action::Insert, 103, &["id", "v"], Vec::new());
        fx.extractor.on_row(&empty_rows).await.unwrap();

        assert!(fx.events.try_recv().is_none());
        // every non-stopped drop advances the progress stamp
        assert_eq!(fx.meta.lock().unwrap().timestamp, 103);
    }

    #[tokio::test]
    async fn test_missing_configured_column_is_dropped() {
        let mut actions = TableActions::new();
        actions.set(Action::Insert, names(&["id", "missing"]));
        let fx = fixture(actions, &["id", "v"], 0, MockReplicationClient::new());

        let event = rows_event(
            Action::Insert,
            100,
            &["id", "v"],
            vec![vec![json!(1), json!("a")]],
        );
        fx.extractor.on_row(&event).await.unwrap();
        assert!(fx.events.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_snapshot_at_event_time_is_not_selectable() {
        let fx = fixture(all_actions(), &["id", "v"], 0, MockReplicationClient::new());
        {
            let mut meta = fx.meta.lock().unwrap();
            let history = meta.histories_mut("app", "users");
            *history = crate::column::ColumnHistory::new();
            history.add(1000, names(&["id", "v"]), vec![1, 1]);
        }

        let event = rows_event(
            Action::Insert,
            1000,
            &["id", "v"],
            vec![vec![json!(1), json!("a")]],
        );
        fx.extractor.on_row(&event).await.unwrap();
        assert!(fx.events.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_ddl_advances_history_and_projection_follows() {
        let mut client = MockReplicationClient::new();
        client.expect_table_columns().returning(|_, _| {
            Ok(TableColumns {
                names: vec!["id".to_string(), "v".to_string(), "w".to_string()],
                types: vec![1, 1, 1],
            })
        });
        let fx = fixture(all_actions(), &["id", "v"], 0, client);

        // an early event projects against the initial snapshot
        let before_ddl = rows_event(
            Action::Insert,
            999,
            &["id", "v"],
            vec![vec![json!(1), json!("a")]],
        );
        fx.extractor.on_row(&before_ddl).await.unwrap();
        let change = fx.events.recv().await.unwrap();
        assert_eq!(change.data[0].len(), 2);

        let header = EventHeader {
            timestamp: 1000,
            log_pos: LOG_POS,
            event_size: EVENT_SIZE,
        };
        fx.extractor
            .on_table_changed(&header, "app", "users")
            .await
            .unwrap();
        {
            let meta = fx.meta.lock().unwrap();
            let history = meta.histories("app", "users").unwrap();
            assert_eq!(history.len(), 2);
            assert_eq!(history.last().unwrap().version, 1000);
        }

        let after_ddl = rows_event(
            Action::Insert,
            1001,
            &["id", "v", "w"],
            vec![vec![json!(1), json!("a"), json!("b")]],
        );
        fx.extractor.on_row(&after_ddl).await.unwrap();
        let change = fx.events.recv().await.unwrap();
        assert_eq!(change.data[0].len(), 3);
        assert_eq!(change.data[0]["w"], json!("b"));
    }

    #[tokio::test]
    async fn test_ddl_with_unchanged_layout_adds_nothing() {
        let mut client = MockReplicationClient::new();
        client.expect_table_columns().returning(|_, _| {
            Ok(TableColumns {
                names: vec!["id".to_string(), "v".to_string()],
                types: vec![1, 1],
            })
        });
        let fx = fixture(all_actions(), &["id", "v"], 0, client);
        {
            // align the stored types with what the mock reports
            let mut meta = fx.meta.lock().unwrap();
            let history = meta.histories_mut("app", "users");
            *history = crate::column::ColumnHistory::new();
            history.add(0, names(&["id", "v"]), vec![1, 1]);
        }

        let header = EventHeader {
            timestamp: 1000,
            log_pos: LOG_POS,
            event_size: EVENT_SIZE,
        };
        fx.extractor
            .on_table_changed(&header, "app", "users")
            .await
            .unwrap();

        let meta = fx.meta.lock().unwrap();
        assert_eq!(meta.histories("app", "users").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ddl_fetch_error_is_swallowed() {
        let mut client = MockReplicationClient::new();
        client
            .expect_table_columns()
            .returning(|_, _| Err(rowcast_core::RowcastError::Database("gone".to_string())));
        let fx = fixture(all_actions(), &["id", "v"], 0, client);

        let header = EventHeader {
            timestamp: 1000,
            log_pos: LOG_POS,
            event_size: EVENT_SIZE,
        };
        let result = fx.extractor.on_table_changed(&header, "app", "users").await;
        assert!(result.is_ok());
        assert_eq!(
            fx.meta.lock().unwrap().histories("app", "users").unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_rotate_updates_position_and_checkpoints() {
        let fx = fixture(all_actions(), &["id", "v"], 0, MockReplicationClient::new());

        let rotate = RotateEvent {
            next_log_name: "mysql-bin.000008".to_string(),
            position: 4,
        };
        fx.extractor.on_rotate(None, &rotate).await.unwrap();

        assert_eq!(
            fx.meta.lock().unwrap().position,
            BinlogPosition::new("mysql-bin.000008", 4)
        );
        // the rotate checkpointed the store
        let raw = std::fs::read_to_string(fx.store.path()).unwrap();
        assert!(raw.contains("mysql-bin.000008"));
    }

    #[tokio::test]
    async fn test_pos_synced_sentinel_stops_the_extractor() {
        let fx = fixture(all_actions(), &["id", "v"], 0, MockReplicationClient::new());

        let stop_at = BinlogPosition::new("mysql-bin.000009", 500);
        fx.extractor
            .on_pos_synced(None, &stop_at, None, true)
            .await
            .unwrap();

        assert!(fx.extractor.is_stopped());
        assert_eq!(fx.meta.lock().unwrap().position, stop_at);

        // a row event past the stop position is discarded entirely
        let event = rows_event(
            Action::Insert,
            100,
            &["id", "v"],
            vec![vec![json!(1), json!("a")]],
        );
        fx.extractor.on_row(&event).await.unwrap();
        assert!(fx.events.try_recv().is_none());
        assert_eq!(fx.meta.lock().unwrap().timestamp, 0);
    }

    #[tokio::test]
    async fn test_pos_synced_without_sentinel_is_ignored() {
        let fx = fixture(all_actions(), &["id", "v"], 0, MockReplicationClient::new());

        let header = EventHeader::default();
        let pos = BinlogPosition::new("mysql-bin.000003", 9);
        fx.extractor
            .on_pos_synced(Some(&header), &pos, None, true)
            .await
            .unwrap();
        fx.extractor
            .on_pos_synced(None, &pos, None, false)
            .await
            .unwrap();

        assert!(!fx.extractor.is_stopped());
        assert_eq!(fx.meta.lock().unwrap().position.pos, 0);
    }

    #[tokio::test]
    async fn test_closed_channel_does_not_panic() {
        let fx = fixture(all_actions(), &["id", "v"], 0, MockReplicationClient::new());
        fx.extractor.close_channel();

        let event = rows_event(
            Action::Insert,
            100,
            &["id", "v"],
            vec![vec![json!(1), json!("a")]],
        );
        fx.extractor.on_row(&event).await.unwrap();
        assert!(fx.events.try_recv().is_none());
        assert!(fx.events.recv().await.is_none());
    }
}
