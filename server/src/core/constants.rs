// =============================================================================
// Application Identity
// =============================================================================

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".tabula";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "tabula.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "TABULA_CONFIG";

// =============================================================================
// Environment Variables - Logging
// =============================================================================

/// Environment variable for the log filter (falls back to RUST_LOG)
pub const ENV_LOG: &str = "TABULA_LOG";

/// Filter used when neither TABULA_LOG nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "info,tabula=info";

// =============================================================================
// Environment Variables - Database
// =============================================================================

/// Environment variable for the database backend (sqlite or postgres)
pub const ENV_DATABASE_BACKEND: &str = "TABULA_DATABASE_BACKEND";

/// Environment variable for the database connection URL
pub const ENV_DATABASE_URL: &str = "TABULA_DATABASE_URL";

/// Environment variable for the pool size
pub const ENV_DATABASE_MAX_CONNECTIONS: &str = "TABULA_DATABASE_MAX_CONNECTIONS";

// =============================================================================
// Environment Variables - Query Limits
// =============================================================================

/// Environment variable for the default page size
pub const ENV_QUERY_DEFAULT_LIMIT: &str = "TABULA_QUERY_DEFAULT_LIMIT";

/// Environment variable for the maximum page size
pub const ENV_QUERY_MAX_LIMIT: &str = "TABULA_QUERY_MAX_LIMIT";

// =============================================================================
// Database Defaults
// =============================================================================

/// Default SQLite URL when nothing is configured
pub const DEFAULT_DATABASE_URL: &str = "sqlite://tabula.db";

/// Default maximum pool size
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default connection acquire timeout in seconds
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Query Defaults
// =============================================================================

/// Default page number
pub const DEFAULT_PAGE: u32 = 1;

/// Default items per page
pub const DEFAULT_QUERY_LIMIT: u32 = 20;

/// Smallest accepted page size
pub const MIN_QUERY_LIMIT: u32 = 1;

/// Largest accepted page size
pub const MAX_QUERY_LIMIT: u32 = 100;

/// Maximum `(field, operator)` pairs in one filter expression
pub const MAX_FILTER_OPERATIONS: usize = 20;

/// Maximum length of a string filter value, in characters
pub const MAX_FILTER_STRING_LENGTH: usize = 255;

/// Maximum number of elements in an array filter value
pub const MAX_FILTER_ARRAY_LENGTH: usize = 100;

/// Search term length bounds, in characters
pub const MIN_SEARCH_LENGTH: usize = 1;
pub const MAX_SEARCH_LENGTH: usize = 100;

/// Maximum length of a sort key, including the `-` prefix
pub const MAX_SORT_LENGTH: usize = 50;

/// Maximum size of a filter passed as a JSON string (64 KiB)
pub const MAX_FILTER_JSON_BYTES: usize = 64 * 1024;
