//! SQL dialect trait for multi-database support
//!
//! This trait defines the interface for generating database-specific SQL syntax.

/// SQL dialect trait for generating database-specific SQL
///
/// Different databases have different syntax for:
/// - Parameter placeholders (? vs $1)
/// - Case-insensitive pattern matching
/// - Type casting
/// - Limit/offset clauses
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Generate a parameter placeholder for the given index (1-based)
    ///
    /// - SQLite: Always returns "?"
    /// - PostgreSQL: Returns "$1", "$2", etc.
    fn placeholder(&self, index: usize) -> String;

    /// Quote an identifier
    ///
    /// Callers only pass names that already matched the identifier pattern;
    /// quoting keeps reserved words (`order`, `user`) usable as column names.
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Case-insensitive LIKE against an escaped pattern (backslash escape)
    ///
    /// - PostgreSQL: `expr ILIKE $1 ESCAPE '\'`
    /// - SQLite: `expr LIKE ? ESCAPE '\'` (LIKE is case-insensitive for ASCII)
    fn ilike(&self, expr: &str, placeholder: &str, negated: bool) -> String;

    /// Cast a column to string type
    ///
    /// - PostgreSQL: `col::TEXT`
    /// - SQLite: `CAST(col AS TEXT)`
    fn cast_to_string(&self, col: &str) -> String;

    /// Generate LIMIT/OFFSET clause
    ///
    /// Most databases use `LIMIT x OFFSET y`, but syntax may vary.
    fn limit_offset(&self, limit: u32, offset: u64) -> String {
        format!("LIMIT {} OFFSET {}", limit, offset)
    }
}
