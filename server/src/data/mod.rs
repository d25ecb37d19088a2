//! Data layer
//!
//! - `query` - filter validation, predicate compilation and query planning
//! - `sql` - SQL dialects for the supported relational backends
//! - `store` - sqlx-backed clients that execute planned queries
//! - `error` - unified error type for the store backends

pub mod error;
pub mod query;
pub mod sql;
pub mod store;

pub use error::DataError;
pub use store::{RelationalStore, Row};
