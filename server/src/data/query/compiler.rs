//! Predicate compiler
//!
//! Turns validated filter conditions into [`Predicate`]s. A field only reaches
//! the query builder if it is both allow-listed for this call and present on
//! the table descriptor.

use chrono::{DateTime, NaiveDate, Utc};

use crate::data::sql::SqlValue;
use crate::utils::sql::contains_pattern;

use super::error::QueryError;
use super::grammar::FilterCondition;
use super::operator::Operator;
use super::predicate::{CompareOp, Predicate};
use super::relative_date::resolve_relative_date;
use super::table::{AllowedColumns, ColumnRef, ColumnType, TableDescriptor};
use super::value::Value;

/// Resolve a field through the allow-list and then the descriptor
pub fn resolve_column<'t>(
    field: &str,
    table: &'t TableDescriptor,
    allowed: &AllowedColumns,
) -> Result<&'t ColumnRef, QueryError> {
    if !allowed.contains(field) {
        return Err(QueryError::FieldNotAllowed {
            field: field.to_string(),
        });
    }
    table.column(field).ok_or_else(|| QueryError::FieldNotFound {
        field: field.to_string(),
    })
}

/// Compile one condition
///
/// Returns `Ok(None)` when the condition is skipped (empty array for a scalar
/// operator, empty set for `in`/`notIn`).
pub fn compile_condition(
    condition: &FilterCondition,
    table: &TableDescriptor,
    allowed: &AllowedColumns,
) -> Result<Option<Predicate>, QueryError> {
    let FilterCondition {
        field,
        operator,
        value,
    } = condition;
    let column = resolve_column(field, table, allowed)?.clone();
    let operator = *operator;

    match operator {
        Operator::Eq
        | Operator::Ne
        | Operator::Gt
        | Operator::Lt
        | Operator::Gte
        | Operator::Lte => {
            let Some(value) = first_scalar(value) else {
                return Ok(None);
            };
            if *value == Value::Null {
                return match operator {
                    Operator::Eq => Ok(Some(Predicate::IsNull {
                        column,
                        negated: false,
                    })),
                    Operator::Ne => Ok(Some(Predicate::IsNull {
                        column,
                        negated: true,
                    })),
                    _ => Err(QueryError::invalid_value(
                        field,
                        operator,
                        "null cannot be ordered",
                    )),
                };
            }
            let value = bind_value(field, operator, value, column.column_type)?;
            Ok(Some(Predicate::Compare {
                column,
                op: compare_op(operator),
                value,
            }))
        }
        Operator::Matches | Operator::NotMatches => {
            let Some(value) = first_scalar(value) else {
                return Ok(None);
            };
            let Some(text) = value.as_text() else {
                return Err(QueryError::invalid_value(
                    field,
                    operator,
                    "expected a search string",
                ));
            };
            Ok(Some(Predicate::Like {
                column,
                pattern: contains_pattern(text),
                negated: operator == Operator::NotMatches,
            }))
        }
        Operator::In | Operator::NotIn => {
            let items: &[Value] = match value {
                Value::List(items) => items,
                Value::Null => &[],
                scalar => std::slice::from_ref(scalar),
            };
            if items.is_empty() {
                tracing::trace!(%field, %operator, "Empty set, condition skipped");
                return Ok(None);
            }
            let values = items
                .iter()
                .map(|item| {
                    if *item == Value::Null {
                        Err(QueryError::invalid_value(
                            field,
                            operator,
                            "null is not allowed in a set",
                        ))
                    } else {
                        bind_value(field, operator, item, column.column_type)
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(Predicate::InList {
                column,
                values,
                negated: operator == Operator::NotIn,
            }))
        }
        Operator::IsEmpty | Operator::IsNotEmpty => Ok(Some(Predicate::IsNull {
            column,
            negated: operator == Operator::IsNotEmpty,
        })),
        Operator::IsBetween => {
            if matches!(column.column_type, ColumnType::Text | ColumnType::Boolean) {
                return Err(QueryError::invalid_value(
                    field,
                    operator,
                    format!("{} columns have no numeric range", column.column_type),
                ));
            }
            let (low, high) = match value {
                Value::List(items) if items.len() == 2 => (&items[0], &items[1]),
                other => {
                    return Err(QueryError::invalid_value(
                        field,
                        operator,
                        format!("expected exactly two numeric values, got {}", other),
                    ));
                }
            };
            if !low.is_numeric() || !high.is_numeric() {
                return Err(QueryError::invalid_value(
                    field,
                    operator,
                    format!("range bounds must be numeric, got [{}, {}]", low, high),
                ));
            }
            Ok(Some(Predicate::Between {
                low: bind_value(field, operator, low, column.column_type)?,
                high: bind_value(field, operator, high, column.column_type)?,
                column,
            }))
        }
        Operator::IsRelativeToToday => {
            let expr = match first_scalar(value) {
                Some(Value::Str(s)) => s.as_str(),
                other => {
                    let shown = other.map(|v| v.to_string()).unwrap_or_default();
                    return Err(QueryError::invalid_value(
                        field,
                        operator,
                        format!("cannot parse relative date '{}'", shown),
                    ));
                }
            };
            let range = resolve_relative_date(expr)
                .and_then(|range| range.to_utc())
                .ok_or_else(|| {
                    QueryError::invalid_value(
                        field,
                        operator,
                        format!("cannot parse relative date '{}'", expr),
                    )
                })?;
            Ok(Some(Predicate::Between {
                low: bind_instant(field, operator, range.0, column.column_type)?,
                high: bind_instant(field, operator, range.1, column.column_type)?,
                column,
            }))
        }
    }
}

/// Build the free-text OR group over every allow-listed column on the table
///
/// Fields missing from the descriptor are skipped. Returns `None` when no
/// searchable column remains.
pub fn compile_search(
    term: &str,
    table: &TableDescriptor,
    allowed: &AllowedColumns,
) -> Option<Predicate> {
    let pattern = contains_pattern(term);
    let matches: Vec<Predicate> = allowed
        .iter()
        .filter_map(|field| table.column(field))
        .map(|column| Predicate::Like {
            column: column.clone(),
            pattern: pattern.clone(),
            negated: false,
        })
        .collect();
    if matches.is_empty() {
        tracing::debug!(table = table.table(), "No searchable columns, search skipped");
        return None;
    }
    Some(Predicate::Any(matches))
}

/// Scalar operators take the first element of an accidental array
fn first_scalar(value: &Value) -> Option<&Value> {
    match value {
        Value::List(items) => items.first(),
        scalar => Some(scalar),
    }
}

fn compare_op(operator: Operator) -> CompareOp {
    match operator {
        Operator::Ne => CompareOp::Ne,
        Operator::Gt => CompareOp::Gt,
        Operator::Lt => CompareOp::Lt,
        Operator::Gte => CompareOp::Gte,
        Operator::Lte => CompareOp::Lte,
        _ => CompareOp::Eq,
    }
}

/// Bind a coerced scalar in the column's storage type
fn bind_value(
    field: &str,
    operator: Operator,
    value: &Value,
    column_type: ColumnType,
) -> Result<SqlValue, QueryError> {
    let mismatch = || {
        QueryError::invalid_value(
            field,
            operator,
            format!("expected {} value, got {} '{}'", column_type, value.kind(), value),
        )
    };

    let bound = match (column_type, value) {
        // Text columns compare against the wire text, not the coerced number
        (ColumnType::Text, scalar) => {
            SqlValue::Text(scalar.as_text().ok_or_else(mismatch)?.to_string())
        }
        (ColumnType::Integer | ColumnType::Real, Value::Int { value, .. }) => {
            SqlValue::Int(*value)
        }
        (ColumnType::Integer | ColumnType::Real, Value::Float { value, .. }) => {
            SqlValue::Float(*value)
        }
        (ColumnType::Boolean, Value::Bool { value, .. }) => SqlValue::Bool(*value),
        (ColumnType::Boolean, Value::Int { value: n @ (0 | 1), .. }) => SqlValue::Bool(*n == 1),
        (ColumnType::Timestamp, Value::Str(s)) => {
            SqlValue::Timestamp(parse_timestamp(s).ok_or_else(mismatch)?)
        }
        (ColumnType::Timestamp, Value::Int { value: secs, .. }) => {
            SqlValue::Timestamp(DateTime::from_timestamp(*secs, 0).ok_or_else(mismatch)?)
        }
        _ => return Err(mismatch()),
    };
    Ok(bound)
}

/// Bind a resolved date boundary; integer columns hold Unix seconds
fn bind_instant(
    field: &str,
    operator: Operator,
    instant: DateTime<Utc>,
    column_type: ColumnType,
) -> Result<SqlValue, QueryError> {
    match column_type {
        ColumnType::Timestamp => Ok(SqlValue::Timestamp(instant)),
        ColumnType::Integer => Ok(SqlValue::Int(instant.timestamp())),
        ColumnType::Real => Ok(SqlValue::Float(instant.timestamp() as f64)),
        ColumnType::Text => Ok(SqlValue::Text(instant.to_rfc3339())),
        ColumnType::Boolean => Err(QueryError::invalid_value(
            field,
            operator,
            "boolean columns cannot hold dates",
        )),
    }
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` date at UTC midnight
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
