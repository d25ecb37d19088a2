//! Generic resource query engine
//!
//! Turns a loosely-typed list request (pagination, sort, free-text search,
//! projection and a JSON filter expression) into parameter-bound SQL against
//! a described table, restricted to a per-call allow-list of fields.
//!
//! Pipeline:
//! - `options` - normalize the wire request into [`QueryOptions`]
//! - `grammar` - structural validation of the filter expression
//! - `value` - wire value coercion
//! - `relative_date` - `last 7 days` style date ranges
//! - `compiler` - allow-list checks and filter -> [`Predicate`]
//! - `engine` - plan and run the page and count queries

pub mod compiler;
pub mod engine;
pub mod error;
pub mod grammar;
pub mod operator;
pub mod options;
pub mod predicate;
pub mod relative_date;
pub mod table;
pub mod value;

pub use engine::{Pagination, QueryEngine, QueryPlan, ResultPage, plan_query};
pub use error::{ErrorCategory, FilterViolation, QueryError};
pub use operator::Operator;
pub use options::{ListParams, QueryOptions, SortDirection, SortSpec};
pub use predicate::Predicate;
pub use table::{AllowedColumns, ColumnRef, ColumnType, ProjectedColumn, TableDescriptor};
pub use value::Value;
