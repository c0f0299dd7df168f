//! Catalog queries backing the replication-client contract

use crate::client::TableColumns;
use crate::config::SourceConfig;
use crate::meta::BinlogPosition;
use rowcast_core::{Result, RowcastError};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySqlPool, Row};
use std::time::Duration;
use tracing::info;

/// Column type codes stored in snapshots and carried by
/// [`TableColumns::types`].
pub mod type_codes {
    pub const NUMBER: i32 = 1;
    pub const FLOAT: i32 = 2;
    pub const ENUM: i32 = 3;
    pub const SET: i32 = 4;
    pub const STRING: i32 = 5;
    pub const DATETIME: i32 = 6;
    pub const TIMESTAMP: i32 = 7;
    pub const DATE: i32 = 8;
    pub const TIME: i32 = 9;
    pub const BIT: i32 = 10;
    pub const JSON: i32 = 11;
    pub const DECIMAL: i32 = 12;
    pub const BINARY: i32 = 13;
    pub const GEOMETRY: i32 = 14;
}

/// Catalog access for one MySQL server: master position and current table
/// layouts.
///
/// This is the queryable half of [`crate::client::ReplicationClient`]; real
/// clients compose it with a binlog stream for the rest of the contract.
pub struct MySqlCatalog {
    pool: MySqlPool,
}

impl MySqlCatalog {
    /// Connect a small pool using the source's address and credentials.
    pub async fn connect(config: &SourceConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password);

        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(|error| {
                RowcastError::Database(format!(
                    "addr[{}]: connect failed: {error}",
                    config.addr()
                ))
            })?;

        info!(addr = %config.addr(), "catalog connection established");
        Ok(Self { pool })
    }

    /// Current master binlog position.
    pub async fn master_position(&self) -> Result<BinlogPosition> {
        let row = sqlx::query("SHOW MASTER STATUS")
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                RowcastError::Database(format!("master status query failed: {error}"))
            })?
            .ok_or_else(|| {
                RowcastError::Database("binary logging is not enabled".to_string())
            })?;

        let name: String = row
            .try_get("File")
            .map_err(|error| RowcastError::Database(error.to_string()))?;
        let pos: u64 = row
            .try_get("Position")
            .map_err(|error| RowcastError::Database(error.to_string()))?;
        Ok(BinlogPosition::new(name, pos as u32))
    }

    /// Current column layout of `schema`.`table`, in ordinal order. An
    /// unknown table yields an empty layout.
    pub async fn table_columns(&self, schema: &str, table: &str) -> Result<TableColumns> {
        let rows = sqlx::query(
            "SELECT column_name AS name, data_type AS data_type \
             FROM information_schema.columns \
             WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            RowcastError::Database(format!(
                "column query failed for {schema}.{table}: {error}"
            ))
        })?;

        let mut columns = TableColumns::default();
        for row in rows {
            let name: String = row
                .try_get("name")
                .map_err(|error| RowcastError::Database(error.to_string()))?;
            let data_type: String = row
                .try_get("data_type")
                .map_err(|error| RowcastError::Database(error.to_string()))?;
            columns.names.push(name);
            columns.types.push(type_code(&data_type));
        }
        Ok(columns)
    }

    /// Cheap connectivity probe.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|error| RowcastError::Database(format!("ping failed: {error}")))?;
        Ok(())
    }
}

/// Numeric code for an `information_schema` data type.
pub fn type_code(data_type: &str) -> i32 {
    use type_codes::*;

    match data_type.to_lowercase().as_str() {
        "tinyint" | "smallint" | "mediumint" | "int" | "bigint" | "year" => NUMBER,
        "float" | "double" => FLOAT,
        "enum" => ENUM,
        "set" => SET,
        "decimal" | "numeric" => DECIMAL,
        "datetime" => DATETIME,
        "timestamp" => TIMESTAMP,
        "date" => DATE,
        "time" => TIME,
        "bit" => BIT,
        "json" => JSON,
        "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" => BINARY,
        "geometry" | "point" | "linestring" | "polygon" => GEOMETRY,
        // char, varchar, text variants and anything exotic degrade to string
        _ => STRING,
    }
}
