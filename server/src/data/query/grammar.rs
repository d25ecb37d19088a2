//! Filter grammar validation
//!
//! Structural checks on a raw filter expression: field name syntax, operator
//! names, operation count and value shape. Nothing here knows about the
//! caller's allow-list; that check belongs to the compiler.

use crate::core::config::QueryConfig;
use crate::utils::sql::is_identifier;

use super::error::{FilterViolation, QueryError};
use super::operator::Operator;
use super::value::{Value, coerce};

/// One `(field, operator, value)` triple that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

/// Parse a filter expression from a JSON string (query parameter form)
pub fn parse_filter_json(
    json_str: &str,
    config: &QueryConfig,
) -> Result<serde_json::Value, QueryError> {
    if json_str.len() > config.max_filter_json_bytes {
        return Err(single_violation(format!(
            "filter JSON exceeds maximum size of {} bytes",
            config.max_filter_json_bytes
        )));
    }
    serde_json::from_str(json_str)
        .map_err(|e| single_violation(format!("filter is not valid JSON: {}", e)))
}

/// Validate a filter expression and coerce its values
///
/// Every violation is collected; if there is at least one, the whole
/// expression is rejected with a single aggregated error.
pub fn validate_filter(
    filter: &serde_json::Value,
    config: &QueryConfig,
) -> Result<Vec<FilterCondition>, QueryError> {
    let serde_json::Value::Object(fields) = filter else {
        return Err(single_violation(
            "filter must be an object of field -> { operator: value }",
        ));
    };

    // Count before doing any per-value work
    let operations: usize = fields
        .values()
        .map(|ops| ops.as_object().map_or(1, |o| o.len()))
        .sum();
    if operations > config.max_filter_operations {
        return Err(single_violation(format!(
            "too many filter operations: {} (max {})",
            operations, config.max_filter_operations
        )));
    }

    let mut violations = Vec::new();
    let mut conditions = Vec::with_capacity(operations);

    for (field, ops) in fields {
        if !is_identifier(field) {
            violations.push(FilterViolation::new(field, "invalid field name"));
            continue;
        }
        let serde_json::Value::Object(ops) = ops else {
            violations.push(FilterViolation::new(
                field,
                "expected an object of operators",
            ));
            continue;
        };

        for (op_name, raw) in ops {
            let Some(operator) = Operator::from_wire(op_name) else {
                violations.push(FilterViolation::new(
                    field,
                    format!("unknown operator '{}'", op_name),
                ));
                continue;
            };
            let value = match coerce(raw, operator) {
                Ok(value) => value,
                Err(e) => {
                    violations.push(FilterViolation::new(field, format!("{}: {}", operator, e.0)));
                    continue;
                }
            };
            if let Err(message) = check_value(&value, config) {
                violations.push(FilterViolation::new(field, format!("{}: {}", operator, message)));
                continue;
            }
            conditions.push(FilterCondition {
                field: field.clone(),
                operator,
                value,
            });
        }
    }

    if !violations.is_empty() {
        tracing::debug!(count = violations.len(), "Filter rejected by grammar");
        return Err(QueryError::InvalidFilter { violations });
    }

    Ok(conditions)
}

fn check_value(value: &Value, config: &QueryConfig) -> Result<(), String> {
    match value {
        Value::List(items) => {
            if items.len() > config.max_array_length {
                return Err(format!(
                    "array exceeds {} elements",
                    config.max_array_length
                ));
            }
            items
                .iter()
                .try_for_each(|item| check_scalar(item, config))
        }
        scalar => check_scalar(scalar, config),
    }
}

fn check_scalar(value: &Value, config: &QueryConfig) -> Result<(), String> {
    match value {
        Value::Str(s) if s.chars().count() > config.max_string_length => Err(format!(
            "string exceeds {} characters",
            config.max_string_length
        )),
        Value::List(_) => Err("nested arrays are not allowed".to_string()),
        _ => Ok(()),
    }
}

fn single_violation(message: impl Into<String>) -> QueryError {
    QueryError::InvalidFilter {
        violations: vec![FilterViolation::new("", message)],
    }
}
