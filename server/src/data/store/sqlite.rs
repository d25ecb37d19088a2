//! SQLite store

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{ConnectOptions, Row as _, SqlitePool};
use tracing::log::LevelFilter;

use crate::core::config::DatabaseConfig;
use crate::data::DataError;
use crate::data::query::table::{ColumnType, ProjectedColumn};
use crate::data::sql::{Backend, BoundQuery};

use super::{Cell, RelationalStore, Row, build_row, count_to_u64};

/// SQLite-backed [`RelationalStore`]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DataError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| DataError::Config(format!("Invalid SQLite URL: {}", e)))?
            .log_statements(LevelFilter::Trace);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(DataError::from_sqlite)?;

        tracing::debug!(
            max_connections = config.max_connections,
            acquire_timeout_secs = config.acquire_timeout_secs,
            "SqliteStore initialized"
        );
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RelationalStore for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn fetch_rows(
        &self,
        query: &BoundQuery,
        columns: &[ProjectedColumn],
    ) -> Result<Vec<Row>, DataError> {
        let rows = bind_params!(sqlx::query(&query.sql), &query.params)
            .fetch_all(&self.pool)
            .await
            .map_err(DataError::from_sqlite)?;

        rows.iter()
            .map(|row| build_row(columns, |idx, ty| decode_cell(row, idx, ty), "sqlite"))
            .collect()
    }

    async fn count_rows(&self, query: &BoundQuery) -> Result<u64, DataError> {
        let count: i64 = bind_params!(sqlx::query_scalar(&query.sql), &query.params)
            .fetch_one(&self.pool)
            .await
            .map_err(DataError::from_sqlite)?;
        Ok(count_to_u64(count))
    }
}

/// SQLite is dynamically typed, so each column type falls back to whatever
/// storage class the value actually has
fn decode_cell(row: &SqliteRow, idx: usize, column_type: ColumnType) -> Result<Cell, String> {
    let text = || {
        row.try_get::<Option<String>, _>(idx)
            .map(|v| v.map_or(Cell::Null, Cell::Text))
    };
    let int = || {
        row.try_get::<Option<i64>, _>(idx)
            .map(|v| v.map_or(Cell::Null, Cell::Int))
    };
    let float = || {
        row.try_get::<Option<f64>, _>(idx)
            .map(|v| v.map_or(Cell::Null, Cell::Float))
    };

    let cell = match column_type {
        ColumnType::Text => text()
            .or_else(|_| int().map(stringify))
            .or_else(|_| float().map(stringify)),
        ColumnType::Integer => int().or_else(|_| float()),
        ColumnType::Real => float().or_else(|_| int()),
        ColumnType::Boolean => row
            .try_get::<Option<bool>, _>(idx)
            .map(|v| v.map_or(Cell::Null, Cell::Bool)),
        ColumnType::Timestamp => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)
            .map(|v| v.map_or(Cell::Null, Cell::Timestamp))
            .or_else(|_| {
                row.try_get::<Option<NaiveDateTime>, _>(idx)
                    .map(|v| v.map_or(Cell::Null, Cell::NaiveTimestamp))
            })
            .or_else(|_| text()),
    };
    cell.map_err(|e| e.to_string())
}

fn stringify(cell: Cell) -> Cell {
    match cell {
        Cell::Int(n) => Cell::Text(n.to_string()),
        Cell::Float(f) => Cell::Text(f.to_string()),
        other => other,
    }
}
