//! Shared API types
//!
//! Maps query engine errors onto HTTP status codes and a stable JSON error
//! body. Client-input errors keep their detail; store errors are logged and
//! replaced by a generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::data::query::QueryError;

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest {
        code: String,
        message: String,
        field: Option<String>,
    },
    NotFound { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
            field: None,
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body: `{ "error", "code", "message" }` plus `field` when known
    pub fn body(&self) -> serde_json::Value {
        let (error_type, code, message) = match self {
            Self::BadRequest { code, message, .. } => ("bad_request", code.as_str(), message),
            Self::NotFound { code, message } => ("not_found", code.as_str(), message),
            Self::Internal { message } => ("internal_error", "INTERNAL", message),
        };
        let mut body = serde_json::json!({
            "error": error_type,
            "code": code,
            "message": message,
        });
        if let Self::BadRequest {
            field: Some(field), ..
        } = self
        {
            body["field"] = serde_json::Value::String(field.clone());
        }
        body
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        let code = match &e {
            QueryError::InvalidFilter { .. } => "INVALID_FILTER",
            QueryError::InvalidOption { .. } => "INVALID_QUERY_OPTION",
            QueryError::FieldNotAllowed { .. } => "INVALID_FILTER_FIELD",
            QueryError::FieldNotFound { .. } => "FIELD_NOT_FOUND",
            QueryError::InvalidValue { .. } => "INVALID_FILTER_VALUE",
            QueryError::NoValidFields => "NO_VALID_FIELDS",
            QueryError::InvalidSortField { .. } => "INVALID_SORT_FIELD",
            QueryError::Store(err) => {
                tracing::error!(error = %err, backend = err.backend(), "Query execution failed");
                return Self::internal("Database operation failed");
            }
        };
        Self::BadRequest {
            code: code.to_string(),
            message: e.to_string(),
            field: e.field().map(String::from),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
