//! Query options
//!
//! [`ListParams`] is the loosely-typed wire shape (query string, JSON body or
//! CLI flags). [`QueryOptions::from_params`] normalizes it: page and limit
//! fall back to defaults instead of failing, while malformed sort or search
//! values are rejected.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::core::config::QueryConfig;
use crate::core::constants::{DEFAULT_PAGE, DEFAULT_QUERY_LIMIT};

use super::error::QueryError;
use super::grammar::parse_filter_json;
use super::value::{Value, coerce_str, split_list};

static SORT_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[a-zA-Z_][a-zA-Z0-9_]*$").expect("Invalid regex"));

/// Accepts `"a,b"` as well as `["a", "b"]`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrArray {
    Single(String),
    Multiple(Vec<String>),
}

impl StringOrArray {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Single(s) => vec![s],
            Self::Multiple(v) => v,
        }
    }
}

/// Raw list request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default)]
    pub page: Option<serde_json::Value>,
    #[serde(default)]
    pub limit: Option<serde_json::Value>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub fields: Option<StringOrArray>,
    /// Object, or the same object serialized as a JSON string
    #[serde(default)]
    pub filter: Option<serde_json::Value>,
    #[serde(default)]
    pub include_deleted: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort key; a leading `-` means descending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn parse(raw: &str, max_len: usize) -> Result<Self, QueryError> {
        if raw.len() > max_len || !SORT_KEY.is_match(raw) {
            return Err(QueryError::InvalidSortField {
                field: raw.to_string(),
            });
        }
        Ok(match raw.strip_prefix('-') {
            Some(field) => Self {
                field: field.to_string(),
                direction: SortDirection::Desc,
            },
            None => Self {
                field: raw.to_string(),
                direction: SortDirection::Asc,
            },
        })
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Normalized options for one `search` call
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub page: u32,
    pub limit: u32,
    pub sort: Option<SortSpec>,
    pub search: Option<String>,
    /// Requested projection; `None` means every allow-listed field
    pub fields: Option<Vec<String>>,
    pub filter: Option<serde_json::Value>,
    pub exclude_soft_deleted: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_QUERY_LIMIT,
            sort: None,
            search: None,
            fields: None,
            filter: None,
            exclude_soft_deleted: true,
        }
    }
}

impl QueryOptions {
    pub fn from_params(params: ListParams, config: &QueryConfig) -> Result<Self, QueryError> {
        let page = params
            .page
            .as_ref()
            .and_then(positive_int)
            .map_or(DEFAULT_PAGE, saturate_u32);

        let limit = params
            .limit
            .as_ref()
            .and_then(positive_int)
            .map_or(config.default_limit, |n| {
                saturate_u32(n).clamp(config.min_limit, config.max_limit)
            });

        let sort = match params.sort.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(SortSpec::parse(raw, config.max_sort_length)?),
            _ => None,
        };

        let search = match params.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let len = term.chars().count();
                if len < config.min_search_length || len > config.max_search_length {
                    return Err(QueryError::invalid_option(
                        "search",
                        format!(
                            "length must be between {} and {} characters",
                            config.min_search_length, config.max_search_length
                        ),
                    ));
                }
                Some(term.to_string())
            }
            _ => None,
        };

        let fields = params.fields.map(|f| {
            f.into_vec()
                .iter()
                .flat_map(|s| s.split(','))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        });
        let fields = fields.filter(|f| !f.is_empty());

        let filter = match params.filter {
            Some(serde_json::Value::String(s)) if s.trim().is_empty() => None,
            Some(serde_json::Value::String(s)) => Some(parse_filter_json(&s, config)?),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other),
        };

        let include_deleted = match params.include_deleted {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Bool(b)) => b,
            Some(serde_json::Value::String(s)) => match coerce_str(s.trim()) {
                Value::Bool { value, .. } => value,
                Value::Int { value: 0, .. } => false,
                Value::Int { value: 1, .. } => true,
                _ => {
                    return Err(QueryError::invalid_option(
                        "includeDeleted",
                        format!("expected a boolean, got '{}'", s),
                    ));
                }
            },
            Some(other) => {
                return Err(QueryError::invalid_option(
                    "includeDeleted",
                    format!("expected a boolean, got {}", other),
                ));
            }
        };

        Ok(Self {
            page,
            limit,
            sort,
            search,
            fields,
            filter,
            exclude_soft_deleted: !include_deleted,
        })
    }
}

/// Positive integer from a JSON number or a numeric string; anything else is `None`
fn positive_int(raw: &serde_json::Value) -> Option<u64> {
    let n = match raw {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => match split_list(s).as_slice() {
            [Value::Int { value, .. }] => u64::try_from(*value).ok(),
            _ => None,
        },
        _ => None,
    };
    n.filter(|n| *n > 0)
}

fn saturate_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
