//! Unified error type for the data layer
//!
//! Wraps backend-specific errors while preserving which backend produced them.

use thiserror::Error;

/// Unified error type for store operations
#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    /// PostgreSQL database error
    #[error("PostgreSQL error: {0}")]
    Postgres(sqlx::Error),

    /// Configuration error (bad URL, invalid descriptor)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection pool exhausted
    #[error("Connection pool exhausted on {backend}")]
    PoolExhausted { backend: &'static str },

    /// Row value could not be decoded into its declared column type
    #[error("Failed to decode column {column} on {backend}: {reason}")]
    Decode {
        backend: &'static str,
        column: String,
        reason: String,
    },
}

impl DataError {
    /// Create a SQLite error, mapping pool timeouts to `PoolExhausted`
    pub fn from_sqlite(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => Self::pool_exhausted("sqlite"),
            e => Self::Sqlite(e),
        }
    }

    /// Create a PostgreSQL error, mapping pool timeouts to `PoolExhausted`
    pub fn from_postgres(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => Self::pool_exhausted("postgres"),
            e => Self::Postgres(e),
        }
    }

    /// Create a pool exhausted error
    pub fn pool_exhausted(backend: &'static str) -> Self {
        Self::PoolExhausted { backend }
    }

    /// Create a decode error
    pub fn decode(backend: &'static str, column: &str, reason: impl Into<String>) -> Self {
        Self::Decode {
            backend,
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    /// Check if this is a connection-related error that might be transient
    pub fn is_transient(&self) -> bool {
        match self {
            Self::PoolExhausted { .. } => true,
            Self::Sqlite(e) | Self::Postgres(e) => {
                matches!(
                    e,
                    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
                )
            }
            _ => false,
        }
    }

    /// Get the backend name that generated this error
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Postgres(_) => "postgres",
            Self::PoolExhausted { backend } | Self::Decode { backend, .. } => *backend,
            Self::Config(_) => "unknown",
        }
    }
}
