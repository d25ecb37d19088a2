//! Wire value coercion
//!
//! Request values arrive loosely typed: query strings carry everything as text,
//! JSON bodies mix numbers, strings and arrays. Coercion turns them into a
//! [`Value`] once, up front, so the compiler only ever pattern-matches typed
//! variants.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::operator::Operator;

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("Invalid regex"));
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+\.\d+$").expect("Invalid regex"));

/// Coerced filter value
///
/// Numbers and booleans keep the wire text they were read from in `raw`, so
/// text columns and LIKE patterns see `"007"` rather than `7`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int { value: i64, raw: String },
    Float { value: f64, raw: String },
    Bool { value: bool, raw: String },
    Null,
    List(Vec<Value>),
}

impl Value {
    pub fn int(value: i64) -> Self {
        Self::Int {
            value,
            raw: value.to_string(),
        }
    }

    pub fn float(value: f64) -> Self {
        Self::Float {
            value,
            raw: value.to_string(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self::Bool {
            value,
            raw: value.to_string(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int { .. } | Self::Float { .. })
    }

    /// Original text of a scalar; `None` for null and arrays
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Str(raw)
            | Self::Int { raw, .. }
            | Self::Float { raw, .. }
            | Self::Bool { raw, .. } => Some(raw),
            Self::Null | Self::List(_) => None,
        }
    }

    /// Short type name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int { .. } => "integer",
            Self::Float { .. } => "number",
            Self::Bool { .. } => "boolean",
            Self::Null => "null",
            Self::List(_) => "array",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(","))
            }
            scalar => write!(f, "{}", scalar.as_text().unwrap_or_default()),
        }
    }
}

/// Raw value that cannot be represented as a filter value (objects, nested arrays)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedValue(pub &'static str);

/// Coerce a single string into the narrowest matching primitive
pub fn coerce_str(s: &str) -> Value {
    let raw = s.to_string();
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool { value: true, raw };
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool { value: false, raw };
    }
    if INTEGER.is_match(s)
        && let Ok(value) = s.parse::<i64>()
    {
        return Value::Int { value, raw };
    }
    if (DECIMAL.is_match(s) || INTEGER.is_match(s))
        && let Ok(value) = s.parse::<f64>()
        && value.is_finite()
    {
        return Value::Float { value, raw };
    }
    Value::Str(raw)
}

/// Coerce a raw wire value for the given operator
///
/// Set-class operators split comma-joined strings into trimmed, coerced
/// elements (empty segments dropped). Arrays are coerced element-wise for
/// every operator; the compiler decides what to do with an array handed to a
/// scalar operator.
pub fn coerce(raw: &serde_json::Value, operator: Operator) -> Result<Value, UnsupportedValue> {
    match raw {
        serde_json::Value::Array(items) => items
            .iter()
            .map(coerce_scalar)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        serde_json::Value::String(s) if operator.splits_strings() && s.contains(',') => {
            Ok(Value::List(split_list(s)))
        }
        other => coerce_scalar(other),
    }
}

fn coerce_scalar(raw: &serde_json::Value) -> Result<Value, UnsupportedValue> {
    match raw {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::boolean(*b)),
        serde_json::Value::Number(n) => {
            let raw = n.to_string();
            if let Some(value) = n.as_i64() {
                Ok(Value::Int { value, raw })
            } else {
                n.as_f64()
                    .map(|value| Value::Float { value, raw })
                    .ok_or(UnsupportedValue("number out of range"))
            }
        }
        serde_json::Value::String(s) => Ok(coerce_str(s)),
        serde_json::Value::Array(_) => Err(UnsupportedValue("nested arrays are not allowed")),
        serde_json::Value::Object(_) => Err(UnsupportedValue("objects are not allowed")),
    }
}

/// Split a comma-joined string into coerced elements
pub fn split_list(s: &str) -> Vec<Value> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(coerce_str)
        .collect()
}

#[cfg(test)]
#[allow(clippy::approx_constant)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_booleans_case_insensitive() {
        assert_eq!(coerce_str("true"), Value::boolean(true));
        assert_eq!(
            coerce_str("FALSE"),
            Value::Bool {
                value: false,
                raw: "FALSE".into()
            }
        );
        assert!(matches!(coerce_str("True"), Value::Bool { value: true, .. }));
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(coerce_str("42"), Value::int(42));
        assert_eq!(coerce_str("-7"), Value::int(-7));
        assert_eq!(coerce_str("3.14"), Value::float(3.14));
        assert_eq!(coerce_str("-0.5"), Value::float(-0.5));
    }

    #[test]
    fn test_coerce_leaves_other_strings() {
        assert_eq!(coerce_str("abc"), Value::Str("abc".into()));
        assert_eq!(coerce_str("1e5"), Value::Str("1e5".into()));
        assert_eq!(coerce_str(".5"), Value::Str(".5".into()));
        assert_eq!(coerce_str("12abc"), Value::Str("12abc".into()));
        assert_eq!(coerce_str(""), Value::Str(String::new()));
    }

    #[test]
    fn test_coerce_integer_overflow_falls_back_to_float() {
        assert_eq!(
            coerce_str("99999999999999999999"),
            Value::Float {
                value: 99999999999999999999.0,
                raw: "99999999999999999999".into()
            }
        );
    }

    #[test]
    fn test_coercion_independent_of_scalar_operator() {
        for op in [Operator::Eq, Operator::Gt, Operator::Matches] {
            assert_eq!(coerce(&json!("true"), op).unwrap(), Value::boolean(true));
            assert_eq!(coerce(&json!("42"), op).unwrap(), Value::int(42));
            assert_eq!(coerce(&json!("3.14"), op).unwrap(), Value::float(3.14));
            assert_eq!(coerce(&json!("abc"), op).unwrap(), Value::Str("abc".into()));
        }
    }

    #[test]
    fn test_set_operator_splits_commas() {
        let value = coerce(&json!("admin, user ,,42"), Operator::In).unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::Str("admin".into()),
                Value::Str("user".into()),
                Value::int(42),
            ])
        );
    }

    #[test]
    fn test_scalar_operator_keeps_commas() {
        let value = coerce(&json!("a,b"), Operator::Eq).unwrap();
        assert_eq!(value, Value::Str("a,b".into()));
    }

    #[test]
    fn test_single_value_for_set_operator_stays_scalar() {
        assert_eq!(
            coerce(&json!("admin"), Operator::In).unwrap(),
            Value::Str("admin".into())
        );
    }

    #[test]
    fn test_array_coerced_element_wise() {
        let value = coerce(&json!(["10", 20, "x", null]), Operator::IsBetween).unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::int(10),
                Value::int(20),
                Value::Str("x".into()),
                Value::Null
            ])
        );
    }

    #[test]
    fn test_json_primitives() {
        assert_eq!(coerce(&json!(1.5), Operator::Eq).unwrap(), Value::float(1.5));
        assert_eq!(coerce(&json!(false), Operator::Eq).unwrap(), Value::boolean(false));
        assert_eq!(coerce(&json!(null), Operator::Eq).unwrap(), Value::Null);
    }

    #[test]
    fn test_rejects_objects_and_nested_arrays() {
        assert!(coerce(&json!({"a": 1}), Operator::Eq).is_err());
        assert!(coerce(&json!([[1, 2]]), Operator::In).is_err());
    }

    #[test]
    fn test_raw_text_is_kept() {
        let value = coerce_str("007");
        assert_eq!(value, Value::Int { value: 7, raw: "007".into() });
        assert_eq!(value.as_text(), Some("007"));
        assert_eq!(coerce_str("1.50").as_text(), Some("1.50"));
        assert_eq!(Value::Null.as_text(), None);

        let value = coerce(&json!("02134, 00501"), Operator::In).unwrap();
        let Value::List(items) = value else {
            panic!("expected list");
        };
        let texts: Vec<_> = items.iter().filter_map(Value::as_text).collect();
        assert_eq!(texts, vec!["02134", "00501"]);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Value::List(vec![Value::int(1), Value::Str("a".into())]).to_string(),
            "[1,a]"
        );
    }
}
