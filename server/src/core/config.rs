use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

use crate::data::DataError;
use crate::data::query::table::{AllowedColumns, ColumnType, TableDescriptor};
use crate::data::sql::Backend;
use crate::utils::file::expand_path;
use crate::utils::sql::is_identifier;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_DATABASE_URL,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_QUERY_LIMIT, MAX_FILTER_ARRAY_LENGTH, MAX_FILTER_JSON_BYTES,
    MAX_FILTER_OPERATIONS, MAX_FILTER_STRING_LENGTH, MAX_QUERY_LIMIT, MAX_SEARCH_LENGTH,
    MAX_SORT_LENGTH, MIN_QUERY_LIMIT, MIN_SEARCH_LENGTH,
};

// =============================================================================
// File Config Sections
// =============================================================================

/// Database configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    /// Backend: sqlite (default) or postgres
    pub backend: Option<Backend>,
    /// Connection URL (or use TABULA_DATABASE_URL env var)
    pub url: Option<String>,
    /// Maximum number of connections in the pool (default: 10)
    pub max_connections: Option<u32>,
    /// Connection acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
}

/// Query limits section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct QueryFileConfig {
    pub default_limit: Option<u32>,
    pub min_limit: Option<u32>,
    pub max_limit: Option<u32>,
    pub max_filter_operations: Option<usize>,
    pub max_string_length: Option<usize>,
    pub max_array_length: Option<usize>,
    pub min_search_length: Option<usize>,
    pub max_search_length: Option<usize>,
    pub max_sort_length: Option<usize>,
    pub max_filter_json_bytes: Option<usize>,
}

/// Column declaration: either just a type (`"text"`) or
/// `{ "column": "physical_name", "type": "integer" }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpec {
    Type(ColumnType),
    Mapped {
        column: Option<String>,
        #[serde(rename = "type", default)]
        column_type: ColumnType,
    },
}

impl ColumnSpec {
    fn column_type(&self) -> ColumnType {
        match self {
            ColumnSpec::Type(ty) => *ty,
            ColumnSpec::Mapped { column_type, .. } => *column_type,
        }
    }

    fn column<'a>(&'a self, field: &'a str) -> &'a str {
        match self {
            ColumnSpec::Mapped {
                column: Some(column),
                ..
            } => column,
            _ => field,
        }
    }
}

/// Queryable resource: a table descriptor plus its default allow-list
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
    pub table: String,
    /// Logical field -> column declaration, in declaration order
    #[serde(deserialize_with = "ordered_columns")]
    pub columns: Vec<(String, ColumnSpec)>,
    #[serde(default)]
    pub soft_delete_column: Option<String>,
    /// Fields callers may touch; defaults to every declared column
    #[serde(default)]
    pub allowed_columns: Option<Vec<String>>,
}

impl ResourceConfig {
    /// Build the table descriptor, validating every identifier
    pub fn descriptor(&self) -> Result<TableDescriptor, DataError> {
        let mut builder = TableDescriptor::builder(&self.table);
        for (field, spec) in &self.columns {
            builder = builder.mapped_column(field, spec.column(field), spec.column_type());
        }
        if let Some(column) = &self.soft_delete_column {
            builder = builder.soft_delete(column);
        }
        builder.build()
    }

    pub fn allowed(&self) -> AllowedColumns {
        match &self.allowed_columns {
            Some(names) => AllowedColumns::new(names),
            None => AllowedColumns::new(self.columns.iter().map(|(field, _)| field)),
        }
    }
}

/// Keep the JSON object order of `columns` (serde_json is built with
/// `preserve_order`)
fn ordered_columns<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<(String, ColumnSpec)>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
    map.into_iter()
        .map(|(field, value)| {
            serde_json::from_value(value)
                .map(|spec| (field.clone(), spec))
                .map_err(|e| D::Error::custom(format!("column '{}': {}", field, e)))
        })
        .collect()
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub database: Option<DatabaseFileConfig>,
    pub query: Option<QueryFileConfig>,
    pub resources: Option<Vec<ResourceConfig>>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        // Database
        if let Some(db) = other.database {
            let current = self.database.get_or_insert_with(DatabaseFileConfig::default);
            if db.backend.is_some() {
                tracing::trace!(backend = ?db.backend, "Merging database.backend");
                current.backend = db.backend;
            }
            if db.url.is_some() {
                tracing::trace!("Merging database.url");
                current.url = db.url;
            }
            if db.max_connections.is_some() {
                current.max_connections = db.max_connections;
            }
            if db.acquire_timeout_secs.is_some() {
                current.acquire_timeout_secs = db.acquire_timeout_secs;
            }
        }

        // Query limits
        if let Some(query) = other.query {
            let current = self.query.get_or_insert_with(QueryFileConfig::default);
            macro_rules! merge_field {
                ($($field:ident),*) => {
                    $(
                        if query.$field.is_some() {
                            tracing::trace!(
                                field = stringify!($field),
                                value = ?query.$field,
                                "Merging query limit"
                            );
                            current.$field = query.$field;
                        }
                    )*
                };
            }
            merge_field!(
                default_limit,
                min_limit,
                max_limit,
                max_filter_operations,
                max_string_length,
                max_array_length,
                min_search_length,
                max_search_length,
                max_sort_length,
                max_filter_json_bytes
            );
        }

        // Resources: same name replaces, new names append
        if let Some(resources) = other.resources {
            let current = self.resources.get_or_insert_with(Vec::new);
            for resource in resources {
                match current.iter_mut().find(|r| r.name == resource.name) {
                    Some(existing) => {
                        tracing::trace!(resource = %resource.name, "Replacing resource");
                        *existing = resource;
                    }
                    None => current.push(resource),
                }
            }
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

/// Limits applied while normalizing and validating list requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    pub default_limit: u32,
    pub min_limit: u32,
    pub max_limit: u32,
    pub max_filter_operations: usize,
    pub max_string_length: usize,
    pub max_array_length: usize,
    pub min_search_length: usize,
    pub max_search_length: usize,
    pub max_sort_length: usize,
    pub max_filter_json_bytes: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_QUERY_LIMIT,
            min_limit: MIN_QUERY_LIMIT,
            max_limit: MAX_QUERY_LIMIT,
            max_filter_operations: MAX_FILTER_OPERATIONS,
            max_string_length: MAX_FILTER_STRING_LENGTH,
            max_array_length: MAX_FILTER_ARRAY_LENGTH,
            min_search_length: MIN_SEARCH_LENGTH,
            max_search_length: MAX_SEARCH_LENGTH,
            max_sort_length: MAX_SORT_LENGTH,
            max_filter_json_bytes: MAX_FILTER_JSON_BYTES,
        }
    }
}

impl QueryConfig {
    fn from_file(file: QueryFileConfig) -> Self {
        let defaults = Self::default();
        Self {
            default_limit: file.default_limit.unwrap_or(defaults.default_limit),
            min_limit: file.min_limit.unwrap_or(defaults.min_limit),
            max_limit: file.max_limit.unwrap_or(defaults.max_limit),
            max_filter_operations: file
                .max_filter_operations
                .unwrap_or(defaults.max_filter_operations),
            max_string_length: file.max_string_length.unwrap_or(defaults.max_string_length),
            max_array_length: file.max_array_length.unwrap_or(defaults.max_array_length),
            min_search_length: file.min_search_length.unwrap_or(defaults.min_search_length),
            max_search_length: file.max_search_length.unwrap_or(defaults.max_search_length),
            max_sort_length: file.max_sort_length.unwrap_or(defaults.max_sort_length),
            max_filter_json_bytes: file
                .max_filter_json_bytes
                .unwrap_or(defaults.max_filter_json_bytes),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub resources: Vec<ResourceConfig>,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.tabula/tabula.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Load from profile dir (~/.tabula/tabula.json) - skip if not exists
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::from_layers(file_config, cli);
        config.validate()?;

        tracing::debug!(
            backend = %config.database.backend,
            resources = config.resources.len(),
            default_limit = config.query.default_limit,
            max_limit = config.query.max_limit,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn from_layers(file_config: FileConfig, cli: &CliConfig) -> Self {
        let file_database = file_config.database.unwrap_or_default();
        let defaults = DatabaseConfig::default();

        let database = DatabaseConfig {
            backend: cli
                .database_backend
                .or(file_database.backend)
                .unwrap_or(defaults.backend),
            url: cli
                .database_url
                .clone()
                .or(file_database.url)
                .unwrap_or(defaults.url),
            max_connections: cli
                .database_max_connections
                .or(file_database.max_connections)
                .unwrap_or(defaults.max_connections),
            acquire_timeout_secs: file_database
                .acquire_timeout_secs
                .unwrap_or(defaults.acquire_timeout_secs),
        };

        let mut query = QueryConfig::from_file(file_config.query.unwrap_or_default());
        if let Some(limit) = cli.query_default_limit {
            query.default_limit = limit;
        }
        if let Some(limit) = cli.query_max_limit {
            query.max_limit = limit;
        }

        Self {
            database,
            query,
            resources: file_config.resources.unwrap_or_default(),
        }
    }

    /// Look up a configured resource by name
    pub fn resource(&self, name: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        let q = &self.query;

        if q.min_limit == 0 {
            anyhow::bail!("Configuration error: query.min_limit must be greater than 0");
        }
        if q.min_limit > q.max_limit {
            anyhow::bail!(
                "Configuration error: query.min_limit ({}) cannot exceed query.max_limit ({})",
                q.min_limit,
                q.max_limit
            );
        }
        if q.default_limit < q.min_limit || q.default_limit > q.max_limit {
            anyhow::bail!(
                "Configuration error: query.default_limit ({}) must be between {} and {}",
                q.default_limit,
                q.min_limit,
                q.max_limit
            );
        }
        if q.min_search_length > q.max_search_length {
            anyhow::bail!(
                "Configuration error: query.min_search_length ({}) cannot exceed query.max_search_length ({})",
                q.min_search_length,
                q.max_search_length
            );
        }
        if q.max_filter_operations == 0 {
            tracing::warn!("query.max_filter_operations is 0, every filter will be rejected");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Configuration error: database.max_connections must be greater than 0");
        }

        let mut names = HashSet::new();
        for resource in &self.resources {
            if !is_identifier(&resource.name) {
                anyhow::bail!(
                    "Configuration error: invalid resource name '{}'",
                    resource.name
                );
            }
            if !names.insert(resource.name.as_str()) {
                anyhow::bail!(
                    "Configuration error: duplicate resource '{}'",
                    resource.name
                );
            }
            let descriptor = resource
                .descriptor()
                .with_context(|| format!("Configuration error in resource '{}'", resource.name))?;

            let allowed = resource.allowed();
            if allowed.is_empty() {
                tracing::warn!(resource = %resource.name, "Resource allows no columns");
            }
            for field in allowed.iter().filter(|f| !descriptor.has_field(f)) {
                tracing::warn!(
                    resource = %resource.name,
                    field,
                    "Allowed column is not declared on the table and will be ignored"
                );
            }
        }

        Ok(())
    }
}

/// Get the profile config path (~/.tabula/tabula.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn users_resource_json() -> &'static str {
        r#"{
            "name": "users",
            "table": "app_users",
            "columns": {
                "name": "text",
                "email": { "type": "text" },
                "joined": { "column": "created_at", "type": "timestamp" },
                "age": "integer"
            },
            "soft_delete_column": "deleted_at",
            "allowed_columns": ["name", "email", "joined"]
        }"#
    }

    #[test]
    fn test_file_config_parse_full() {
        let json = format!(
            r#"{{
                "database": {{ "backend": "postgres", "url": "postgres://localhost/app", "max_connections": 5 }},
                "query": {{ "default_limit": 25, "max_limit": 200 }},
                "resources": [{}]
            }}"#,
            users_resource_json()
        );
        let config: FileConfig = serde_json::from_str(&json).unwrap();

        let db = config.database.as_ref().unwrap();
        assert_eq!(db.backend, Some(Backend::Postgres));
        assert_eq!(db.max_connections, Some(5));
        assert_eq!(config.query.as_ref().unwrap().default_limit, Some(25));
        assert_eq!(config.resources.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_file_config_parse_empty() {
        let config: FileConfig = serde_json::from_str("{}").unwrap();
        assert!(config.database.is_none());
        assert!(config.resources.is_none());
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let json = r#"{ "database": { "url": "sqlite::memory:" }, "unknown_field": 123 }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.extra.get("unknown_field").unwrap(), 123);
    }

    #[test]
    fn test_resource_columns_keep_order_and_mapping() {
        let resource: ResourceConfig = serde_json::from_str(users_resource_json()).unwrap();
        let fields: Vec<&str> = resource.columns.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "joined", "age"]);

        let table = resource.descriptor().unwrap();
        assert_eq!(table.table(), "app_users");
        let joined = table.column("joined").unwrap();
        assert_eq!(joined.column, "created_at");
        assert_eq!(joined.column_type, ColumnType::Timestamp);
        assert_eq!(table.column("age").unwrap().column_type, ColumnType::Integer);
        assert_eq!(table.soft_delete_column(), Some("deleted_at"));

        let allowed = resource.allowed();
        assert!(allowed.contains("joined"));
        assert!(!allowed.contains("age"));
    }

    #[test]
    fn test_resource_allowed_defaults_to_all_columns() {
        let resource: ResourceConfig = serde_json::from_str(
            r#"{ "name": "tags", "table": "tags", "columns": { "label": "text", "hits": "integer" } }"#,
        )
        .unwrap();
        assert_eq!(resource.allowed().iter().collect::<Vec<_>>(), vec!["label", "hits"]);
    }

    #[test]
    fn test_resource_rejects_unknown_column_type() {
        let result: std::result::Result<ResourceConfig, _> = serde_json::from_str(
            r#"{ "name": "t", "table": "t", "columns": { "a": "blob" } }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_file_config_merge() {
        let mut base: FileConfig = serde_json::from_str(
            r#"{
                "database": { "url": "sqlite://base.db", "max_connections": 4 },
                "query": { "default_limit": 10, "max_limit": 50 },
                "resources": [
                    { "name": "a", "table": "a", "columns": { "x": "text" } },
                    { "name": "b", "table": "b", "columns": { "y": "text" } }
                ]
            }"#,
        )
        .unwrap();
        let overlay: FileConfig = serde_json::from_str(
            r#"{
                "database": { "url": "sqlite://overlay.db" },
                "query": { "max_limit": 80 },
                "resources": [
                    { "name": "b", "table": "b2", "columns": { "z": "integer" } },
                    { "name": "c", "table": "c", "columns": { "w": "text" } }
                ]
            }"#,
        )
        .unwrap();
        base.merge(overlay);

        let db = base.database.as_ref().unwrap();
        assert_eq!(db.url.as_deref(), Some("sqlite://overlay.db"));
        assert_eq!(db.max_connections, Some(4));
        let query = base.query.as_ref().unwrap();
        assert_eq!(query.default_limit, Some(10));
        assert_eq!(query.max_limit, Some(80));

        let resources = base.resources.as_ref().unwrap();
        let names: Vec<&str> = resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(resources[1].table, "b2");
    }

    #[test]
    fn test_app_config_layers_cli_over_file() {
        let file: FileConfig = serde_json::from_str(
            r#"{ "database": { "backend": "sqlite", "url": "sqlite://file.db" }, "query": { "default_limit": 30 } }"#,
        )
        .unwrap();
        let cli = CliConfig {
            database_backend: Some(Backend::Postgres),
            database_url: Some("postgres://cli/db".into()),
            query_max_limit: Some(500),
            ..CliConfig::default()
        };
        let config = AppConfig::from_layers(file, &cli);
        assert_eq!(config.database.backend, Backend::Postgres);
        assert_eq!(config.database.url, "postgres://cli/db");
        assert_eq!(config.database.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.query.default_limit, 30);
        assert_eq!(config.query.max_limit, 500);
        assert_eq!(config.query.min_limit, MIN_QUERY_LIMIT);
        assert!(config.validate().is_ok());
    }

    fn config_with_query(query: QueryConfig) -> AppConfig {
        AppConfig {
            database: DatabaseConfig::default(),
            query,
            resources: Vec::new(),
        }
    }

    #[test]
    fn test_validation_limits() {
        let zero_min = QueryConfig {
            min_limit: 0,
            ..QueryConfig::default()
        };
        assert!(config_with_query(zero_min).validate().is_err());

        let inverted = QueryConfig {
            min_limit: 50,
            max_limit: 10,
            default_limit: 20,
            ..QueryConfig::default()
        };
        assert!(config_with_query(inverted).validate().is_err());

        let default_out_of_range = QueryConfig {
            default_limit: 500,
            ..QueryConfig::default()
        };
        assert!(config_with_query(default_out_of_range).validate().is_err());

        assert!(config_with_query(QueryConfig::default()).validate().is_ok());
    }

    #[test]
    fn test_validation_resources() {
        let resource: ResourceConfig = serde_json::from_str(users_resource_json()).unwrap();
        let mut config = config_with_query(QueryConfig::default());
        config.resources = vec![resource.clone(), resource.clone()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate resource"));

        let mut bad = resource;
        bad.table = "users; DROP TABLE x".into();
        config.resources = vec![bad];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_config_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "database": {{ "url": "sqlite::memory:" }}, "resources": [{}] }}"#,
            users_resource_json()
        )
        .unwrap();

        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            ..CliConfig::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert!(config.resource("users").is_some());
        assert!(config.resource("missing").is_none());
    }

    #[test]
    fn test_load_missing_config_path_fails() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/definitely/not/here/tabula.json")),
            ..CliConfig::default()
        };
        assert!(AppConfig::load(&cli).is_err());
    }
}
