//! SQLite SQL dialect implementation

use super::SqlDialect;

/// SQLite SQL dialect
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn ilike(&self, expr: &str, placeholder: &str, negated: bool) -> String {
        // SQLite has no ILIKE; plain LIKE already ignores ASCII case
        let op = if negated { "NOT LIKE" } else { "LIKE" };
        format!("{} {} {} ESCAPE '\\'", expr, op, placeholder)
    }

    fn cast_to_string(&self, col: &str) -> String {
        format!("CAST({} AS TEXT)", col)
    }
}
