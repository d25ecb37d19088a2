//! Relational store clients
//!
//! The engine talks to the database only through [`RelationalStore`]: one
//! parameter-bound select and one parameter-bound count. Rows come back as
//! JSON objects keyed by logical field name, decoded according to each
//! column's declared [`ColumnType`].

/// Bind every `SqlValue` onto a sqlx query, in placeholder order
macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut bound = $query;
        for param in $params {
            bound = match param {
                $crate::data::sql::SqlValue::Text(v) => bound.bind(v.clone()),
                $crate::data::sql::SqlValue::Int(v) => bound.bind(*v),
                $crate::data::sql::SqlValue::Float(v) => bound.bind(*v),
                $crate::data::sql::SqlValue::Bool(v) => bound.bind(*v),
                $crate::data::sql::SqlValue::Timestamp(v) => bound.bind(*v),
            };
        }
        bound
    }};
}

mod postgres;
mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::core::config::DatabaseConfig;
use crate::data::DataError;
use crate::data::query::table::{ColumnType, ProjectedColumn};
use crate::data::sql::{Backend, BoundQuery};

/// One result row, keyed by logical field name in projection order
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Executes compiled queries against a relational database
#[async_trait]
pub trait RelationalStore: Send + Sync {
    fn backend(&self) -> Backend;

    /// Run a select whose result columns line up with `columns`
    async fn fetch_rows(
        &self,
        query: &BoundQuery,
        columns: &[ProjectedColumn],
    ) -> Result<Vec<Row>, DataError>;

    /// Run a `SELECT COUNT(*)` query
    async fn count_rows(&self, query: &BoundQuery) -> Result<u64, DataError>;
}

/// Open a pool for the configured backend
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn RelationalStore>, DataError> {
    if config.url.trim().is_empty() {
        return Err(DataError::Config("Database URL is required".into()));
    }
    let store: Arc<dyn RelationalStore> = match config.backend {
        Backend::Sqlite => Arc::new(SqliteStore::connect(config).await?),
        Backend::Postgres => Arc::new(PostgresStore::connect(config).await?),
    };
    Ok(store)
}

/// Column value pulled out of a driver row, before JSON conversion
#[derive(Debug)]
pub(crate) enum Cell {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    NaiveTimestamp(NaiveDateTime),
    Date(NaiveDate),
}

impl From<Cell> for serde_json::Value {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Null => serde_json::Value::Null,
            Cell::Text(s) => serde_json::Value::String(s),
            Cell::Int(n) => serde_json::Value::from(n),
            // Non-finite floats become null
            Cell::Float(f) => serde_json::Value::from(f),
            Cell::Bool(b) => serde_json::Value::Bool(b),
            Cell::Timestamp(ts) => {
                serde_json::Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Cell::NaiveTimestamp(ts) => serde_json::Value::String(
                ts.and_utc().to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ),
            Cell::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Assemble a [`Row`] from cells decoded in projection order
pub(crate) fn build_row(
    columns: &[ProjectedColumn],
    decode: impl Fn(usize, ColumnType) -> Result<Cell, String>,
    backend: &'static str,
) -> Result<Row, DataError> {
    let mut row = Row::with_capacity(columns.len());
    for (idx, projected) in columns.iter().enumerate() {
        let cell = decode(idx, projected.column.column_type)
            .map_err(|reason| DataError::decode(backend, &projected.column.column, reason))?;
        row.insert(projected.field.clone(), cell.into());
    }
    Ok(row)
}

/// Counts come back as `i64` from both drivers
pub(crate) fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}
