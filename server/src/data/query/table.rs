//! Table descriptors and per-call allow-lists
//!
//! A [`TableDescriptor`] maps logical field names to physical column
//! references. It is built once at startup (from configuration or code) and
//! shared read-only; lookups are plain map reads with an explicit not-found
//! branch.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::DataError;
use crate::utils::sql::is_identifier;

/// Storage type of a column, drives value binding and row decoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Integer,
    Real,
    Boolean,
    Timestamp,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Text => write!(f, "text"),
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Real => write!(f, "real"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// Physical column behind a logical field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub column: String,
    pub column_type: ColumnType,
}

/// Selected column, keyed by the logical name it is returned under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedColumn {
    pub field: String,
    pub column: ColumnRef,
}

/// Queryable table plus the logical fields it exposes
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    table: String,
    columns: HashMap<String, ColumnRef>,
    /// Logical names in declaration order
    order: Vec<String>,
    soft_delete: Option<String>,
}

impl TableDescriptor {
    pub fn builder(table: impl Into<String>) -> TableDescriptorBuilder {
        TableDescriptorBuilder {
            table: table.into(),
            columns: Vec::new(),
            soft_delete: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self, field: &str) -> Option<&ColumnRef> {
        self.columns.get(field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.columns.contains_key(field)
    }

    /// Logical field names in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Physical deletion-timestamp column, if the table is soft-delete aware
    pub fn soft_delete_column(&self) -> Option<&str> {
        self.soft_delete.as_deref()
    }
}

/// Builder for [`TableDescriptor`]; validates every identifier on `build`
#[derive(Debug)]
pub struct TableDescriptorBuilder {
    table: String,
    columns: Vec<(String, ColumnRef)>,
    soft_delete: Option<String>,
}

impl TableDescriptorBuilder {
    /// Add a field whose physical column has the same name
    pub fn column(self, field: impl Into<String>, column_type: ColumnType) -> Self {
        let field = field.into();
        let column = field.clone();
        self.mapped_column(field, column, column_type)
    }

    /// Add a field backed by a differently-named physical column
    pub fn mapped_column(
        mut self,
        field: impl Into<String>,
        column: impl Into<String>,
        column_type: ColumnType,
    ) -> Self {
        self.columns.push((
            field.into(),
            ColumnRef {
                column: column.into(),
                column_type,
            },
        ));
        self
    }

    pub fn soft_delete(mut self, column: impl Into<String>) -> Self {
        self.soft_delete = Some(column.into());
        self
    }

    pub fn build(self) -> Result<TableDescriptor, DataError> {
        if !is_identifier(&self.table) {
            return Err(DataError::Config(format!(
                "Invalid table name: {}",
                self.table
            )));
        }
        if let Some(col) = &self.soft_delete
            && !is_identifier(col)
        {
            return Err(DataError::Config(format!(
                "Invalid soft delete column on {}: {}",
                self.table, col
            )));
        }

        let mut columns = HashMap::with_capacity(self.columns.len());
        let mut order = Vec::with_capacity(self.columns.len());
        for (field, column) in self.columns {
            if !is_identifier(&field) || !is_identifier(&column.column) {
                return Err(DataError::Config(format!(
                    "Invalid column on {}: {} -> {}",
                    self.table, field, column.column
                )));
            }
            if columns.insert(field.clone(), column).is_some() {
                return Err(DataError::Config(format!(
                    "Duplicate field on {}: {}",
                    self.table, field
                )));
            }
            order.push(field);
        }

        Ok(TableDescriptor {
            table: self.table,
            columns,
            order,
            soft_delete: self.soft_delete,
        })
    }
}

/// Logical field names a caller may touch for one call
///
/// Keeps the caller's order (it drives projection and search order) and
/// drops duplicates.
#[derive(Debug, Clone, Default)]
pub struct AllowedColumns {
    names: Vec<String>,
    lookup: HashSet<String>,
}

impl AllowedColumns {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed = Self::default();
        for name in names {
            let name = name.as_ref();
            if allowed.lookup.insert(name.to_string()) {
                allowed.names.push(name.to_string());
            }
        }
        allowed
    }

    pub fn contains(&self, field: &str) -> bool {
        self.lookup.contains(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
