//! PostgreSQL store

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{ConnectOptions, PgPool, Row as _};
use tracing::log::LevelFilter;

use crate::core::config::DatabaseConfig;
use crate::data::DataError;
use crate::data::query::table::{ColumnType, ProjectedColumn};
use crate::data::sql::{Backend, BoundQuery};

use super::{Cell, RelationalStore, Row, build_row, count_to_u64};

/// PostgreSQL-backed [`RelationalStore`]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DataError> {
        let options: PgConnectOptions = config
            .url
            .parse()
            .map_err(|e| DataError::Config(format!("Invalid PostgreSQL URL: {}", e)))?;
        let options = options.log_statements(LevelFilter::Trace);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(DataError::from_postgres)?;

        tracing::debug!(
            max_connections = config.max_connections,
            acquire_timeout_secs = config.acquire_timeout_secs,
            "PostgresStore initialized"
        );
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RelationalStore for PostgresStore {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn fetch_rows(
        &self,
        query: &BoundQuery,
        columns: &[ProjectedColumn],
    ) -> Result<Vec<Row>, DataError> {
        let rows = bind_params!(sqlx::query(&query.sql), &query.params)
            .fetch_all(&self.pool)
            .await
            .map_err(DataError::from_postgres)?;

        rows.iter()
            .map(|row| build_row(columns, |idx, ty| decode_cell(row, idx, ty), "postgres"))
            .collect()
    }

    async fn count_rows(&self, query: &BoundQuery) -> Result<u64, DataError> {
        let count: i64 = bind_params!(sqlx::query_scalar(&query.sql), &query.params)
            .fetch_one(&self.pool)
            .await
            .map_err(DataError::from_postgres)?;
        Ok(count_to_u64(count))
    }
}

/// Postgres is strictly typed; try the widest Rust type first and narrow
fn decode_cell(row: &PgRow, idx: usize, column_type: ColumnType) -> Result<Cell, String> {
    let cell = match column_type {
        ColumnType::Text => row
            .try_get::<Option<String>, _>(idx)
            .map(|v| v.map_or(Cell::Null, Cell::Text)),
        ColumnType::Integer => row
            .try_get::<Option<i64>, _>(idx)
            .map(|v| v.map_or(Cell::Null, Cell::Int))
            .or_else(|_| {
                row.try_get::<Option<i32>, _>(idx)
                    .map(|v| v.map_or(Cell::Null, |n| Cell::Int(n.into())))
            })
            .or_else(|_| {
                row.try_get::<Option<i16>, _>(idx)
                    .map(|v| v.map_or(Cell::Null, |n| Cell::Int(n.into())))
            }),
        ColumnType::Real => row
            .try_get::<Option<f64>, _>(idx)
            .map(|v| v.map_or(Cell::Null, Cell::Float))
            .or_else(|_| {
                row.try_get::<Option<f32>, _>(idx)
                    .map(|v| v.map_or(Cell::Null, |n| Cell::Float(n.into())))
            }),
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
            .or_else(|_| {
                row.try_get::<Option<NaiveDate>, _>(idx)
                    .map(|v| v.map_or(Cell::Null, Cell::Date))
            }),
    };
    cell.map_err(|e| e.to_string())
}
