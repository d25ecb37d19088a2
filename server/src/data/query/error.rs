//! Query engine error types

use std::fmt;

use thiserror::Error;

use crate::data::DataError;

use super::operator::Operator;

/// Broad error class, used by the API layer to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed filter shape, bad names, too many operations, bad options
    Grammar,
    /// Field not allow-listed or absent from the table
    Access,
    /// Value has the wrong arity or type for its operator or column
    Value,
    /// No projectable fields remain
    Projection,
    /// Sort key rejected
    Sort,
    /// Store execution failed
    Store,
}

impl ErrorCategory {
    /// Client-input errors are detected before any query is issued
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store)
    }
}

/// One structural problem found in a filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterViolation {
    pub field: String,
    pub message: String,
}

impl FilterViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FilterViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid filter: {}", join_violations(.violations))]
    InvalidFilter { violations: Vec<FilterViolation> },

    #[error("Invalid query option {option}: {message}")]
    InvalidOption {
        option: &'static str,
        message: String,
    },

    #[error("Invalid filter field: {field}")]
    FieldNotAllowed { field: String },

    #[error("Field does not exist: {field}")]
    FieldNotFound { field: String },

    #[error("Invalid value for {field} ({operator}): {message}")]
    InvalidValue {
        field: String,
        operator: Operator,
        message: String,
    },

    #[error("No valid fields specified")]
    NoValidFields,

    #[error("Invalid sort field: {field}")]
    InvalidSortField { field: String },

    #[error(transparent)]
    Store(#[from] DataError),
}

impl QueryError {
    pub fn invalid_value(
        field: impl Into<String>,
        operator: Operator,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            operator,
            message: message.into(),
        }
    }

    pub fn invalid_option(option: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            option,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidFilter { .. } | Self::InvalidOption { .. } => ErrorCategory::Grammar,
            Self::FieldNotAllowed { .. } | Self::FieldNotFound { .. } => ErrorCategory::Access,
            Self::InvalidValue { .. } => ErrorCategory::Value,
            Self::NoValidFields => ErrorCategory::Projection,
            Self::InvalidSortField { .. } => ErrorCategory::Sort,
            Self::Store(_) => ErrorCategory::Store,
        }
    }

    /// The request field this error is about, when there is exactly one
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::FieldNotAllowed { field }
            | Self::FieldNotFound { field }
            | Self::InvalidValue { field, .. }
            | Self::InvalidSortField { field } => Some(field.as_str()),
            Self::InvalidFilter { violations }
                if violations.len() == 1 && !violations[0].field.is_empty() =>
            {
                Some(violations[0].field.as_str())
            }
            _ => None,
        }
    }
}

fn join_violations(violations: &[FilterViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_display_aggregates() {
        let err = QueryError::InvalidFilter {
            violations: vec![
                FilterViolation::new("id; DROP TABLE users", "invalid field name"),
                FilterViolation::new("role", "unknown operator 'like'"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Invalid filter: id; DROP TABLE users: invalid field name; role: unknown operator 'like'"
        );
        assert_eq!(err.category(), ErrorCategory::Grammar);
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_access_errors() {
        let err = QueryError::FieldNotAllowed {
            field: "password".into(),
        };
        assert_eq!(err.to_string(), "Invalid filter field: password");
        assert_eq!(err.category(), ErrorCategory::Access);

        let err = QueryError::FieldNotFound {
            field: "ghost".into(),
        };
        assert_eq!(err.to_string(), "Field does not exist: ghost");
        assert_eq!(err.field(), Some("ghost"));
    }

    #[test]
    fn test_value_error_names_field_and_operator() {
        let err = QueryError::invalid_value("age", Operator::IsBetween, "expected two numbers");
        assert_eq!(
            err.to_string(),
            "Invalid value for age (isBetween): expected two numbers"
        );
        assert_eq!(err.category(), ErrorCategory::Value);
    }

    #[test]
    fn test_store_error_is_not_client_error() {
        let err = QueryError::from(DataError::Config("boom".into()));
        assert_eq!(err.category(), ErrorCategory::Store);
        assert!(!err.category().is_client_error());
        assert!(QueryError::NoValidFields.category().is_client_error());
    }
}
