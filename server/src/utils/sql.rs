//! SQL utility functions

use std::sync::LazyLock;

use regex::Regex;

/// Matches a bare SQL identifier (letters, digits, underscore; no leading digit)
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("Invalid regex"));

/// Check whether a name is a safe bare identifier
///
/// Field names, sort keys and configured table/column names must pass this
/// before they are allowed anywhere near a query builder.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Escape SQL LIKE metacharacters (%, _, \) in user input
///
/// Use this when building LIKE patterns from user input to prevent
/// unintended pattern matching.
///
/// # Example
///
/// ```
/// use tabula_server::utils::sql::escape_like_pattern;
///
/// let user_input = "100% match_test";
/// let pattern = format!("%{}%", escape_like_pattern(user_input));
/// assert_eq!(pattern, "%100\\% match\\_test%");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Build a `%needle%` substring pattern with metacharacters escaped
pub fn contains_pattern(needle: &str) -> String {
    format!("%{}%", escape_like_pattern(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_pattern_no_special_chars() {
        assert_eq!(escape_like_pattern("alice"), "alice");
    }

    #[test]
    fn test_escape_like_pattern_percent_and_underscore() {
        assert_eq!(escape_like_pattern("50%_off"), "50\\%\\_off");
    }

    #[test]
    fn test_escape_like_pattern_backslash_first() {
        // Backslash must be doubled before the other escapes are added
        assert_eq!(escape_like_pattern("a\\%"), "a\\\\\\%");
    }

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern("alice"), "%alice%");
        assert_eq!(contains_pattern("%"), "%\\%%");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("created_at"));
        assert!(is_identifier("_hidden"));
        assert!(is_identifier("Col2"));
        assert!(!is_identifier("2col"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("id; DROP TABLE users"));
        assert!(!is_identifier("name\"--"));
        assert!(!is_identifier("users.name"));
    }
}
