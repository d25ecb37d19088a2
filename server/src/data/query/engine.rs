//! Query orchestrator
//!
//! Composes soft-delete exclusion, compiled filters, free-text search,
//! projection, sorting and pagination into a page query and a count query
//! sharing one WHERE clause. Planning is pure and runs to completion before
//! the store is touched, so every client-input error issues zero queries.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::config::QueryConfig;
use crate::data::sql::{BoundQuery, SqlDialect, SqlParams};
use crate::data::store::{RelationalStore, Row};

use super::compiler::{compile_condition, compile_search};
use super::error::QueryError;
use super::grammar::validate_filter;
use super::options::QueryOptions;
use super::predicate::{Predicate, where_clause};
use super::table::{AllowedColumns, ColumnRef, ColumnType, ProjectedColumn, TableDescriptor};

/// Pagination block of a [`ResultPage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(u64::from(limit.max(1))),
        }
    }
}

/// One page of results plus totals computed under the same predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPage<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl ResultPage<Row> {
    /// Deserialize each row into a caller type
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<ResultPage<T>, serde_json::Error> {
        let items = self
            .items
            .into_iter()
            .map(|row| serde_json::from_value(serde_json::Value::Object(row)))
            .collect::<Result<Vec<T>, _>>()?;
        Ok(ResultPage {
            items,
            pagination: self.pagination,
        })
    }
}

/// Fully compiled queries for one `search` call
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub select: BoundQuery,
    pub count: BoundQuery,
    pub columns: Vec<ProjectedColumn>,
    pub page: u32,
    pub limit: u32,
}

/// Compile options against a table and allow-list without touching a store
pub fn plan_query(
    table: &TableDescriptor,
    allowed: &AllowedColumns,
    options: &QueryOptions,
    config: &QueryConfig,
    dialect: &dyn SqlDialect,
) -> Result<QueryPlan, QueryError> {
    let page = options.page.max(1);
    let limit = options.limit.clamp(config.min_limit, config.max_limit);
    let offset = u64::from(page - 1) * u64::from(limit);

    let mut predicates = Vec::new();

    if options.exclude_soft_deleted
        && let Some(column) = table.soft_delete_column()
    {
        predicates.push(Predicate::IsNull {
            column: ColumnRef {
                column: column.to_string(),
                column_type: ColumnType::Timestamp,
            },
            negated: false,
        });
    }

    if let Some(filter) = &options.filter {
        for condition in validate_filter(filter, config)? {
            if let Some(predicate) = compile_condition(&condition, table, allowed)? {
                predicates.push(predicate);
            }
        }
    }

    if let Some(term) = &options.search
        && let Some(predicate) = compile_search(term, table, allowed)
    {
        predicates.push(predicate);
    }

    let mut params = SqlParams::default();
    let where_sql = where_clause(&predicates, dialect, &mut params);

    let columns = project(table, allowed, options.fields.as_deref())?;
    let order_sql = match &options.sort {
        Some(sort) => {
            let column = match table.column(&sort.field) {
                Some(column) if allowed.contains(&sort.field) => column,
                _ => {
                    return Err(QueryError::InvalidSortField {
                        field: sort.field.clone(),
                    });
                }
            };
            format!(
                " ORDER BY {} {}",
                dialect.quote_ident(&column.column),
                sort.direction.as_sql()
            )
        }
        None => String::new(),
    };

    let table_sql = dialect.quote_ident(table.table());
    let select_list = columns
        .iter()
        .map(|c| dialect.quote_ident(&c.column.column))
        .collect::<Vec<_>>()
        .join(", ");

    let select = BoundQuery {
        sql: format!(
            "SELECT {} FROM {}{}{} {}",
            select_list,
            table_sql,
            where_sql,
            order_sql,
            dialect.limit_offset(limit, offset)
        ),
        params: params.values.clone(),
    };
    let count = BoundQuery {
        sql: format!("SELECT COUNT(*) FROM {}{}", table_sql, where_sql),
        params: params.values,
    };

    tracing::debug!(
        table = table.table(),
        predicates = predicates.len(),
        columns = columns.len(),
        page,
        limit,
        "Query planned"
    );
    tracing::trace!(sql = %select.sql, params = ?select.params, "Page query");

    Ok(QueryPlan {
        select,
        count,
        columns,
        page,
        limit,
    })
}

/// Requested fields only gate the call; the projection itself is always the
/// allow-listed fields present on the table
fn project(
    table: &TableDescriptor,
    allowed: &AllowedColumns,
    requested: Option<&[String]>,
) -> Result<Vec<ProjectedColumn>, QueryError> {
    if let Some(requested) = requested
        && !requested.iter().any(|f| allowed.contains(f))
    {
        return Err(QueryError::NoValidFields);
    }

    let columns: Vec<ProjectedColumn> = allowed
        .iter()
        .filter_map(|field| {
            table.column(field).map(|column| ProjectedColumn {
                field: field.to_string(),
                column: column.clone(),
            })
        })
        .collect();
    if columns.is_empty() {
        return Err(QueryError::NoValidFields);
    }
    Ok(columns)
}

/// Runs planned queries against a [`RelationalStore`]
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn RelationalStore>,
    config: QueryConfig,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn RelationalStore>, config: QueryConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn plan(
        &self,
        table: &TableDescriptor,
        allowed: &AllowedColumns,
        options: &QueryOptions,
    ) -> Result<QueryPlan, QueryError> {
        plan_query(
            table,
            allowed,
            options,
            &self.config,
            self.store.backend().dialect(),
        )
    }

    /// Fetch one page and the matching total
    ///
    /// Both queries run concurrently; if either fails the other is dropped.
    pub async fn search(
        &self,
        table: &TableDescriptor,
        allowed: &AllowedColumns,
        options: &QueryOptions,
    ) -> Result<ResultPage<Row>, QueryError> {
        let plan = self.plan(table, allowed, options)?;

        let (items, total) = tokio::try_join!(
            self.store.fetch_rows(&plan.select, &plan.columns),
            self.store.count_rows(&plan.count),
        )?;

        tracing::debug!(
            table = table.table(),
            items = items.len(),
            total,
            "Query executed"
        );
        Ok(ResultPage {
            items,
            pagination: Pagination::new(plan.page, plan.limit, total),
        })
    }
}
