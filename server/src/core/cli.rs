use clap::{Parser, Subcommand};

use std::path::PathBuf;

use crate::data::sql::Backend;

use super::constants::{
    ENV_CONFIG, ENV_DATABASE_BACKEND, ENV_DATABASE_MAX_CONNECTIONS, ENV_DATABASE_URL,
    ENV_QUERY_DEFAULT_LIMIT, ENV_QUERY_MAX_LIMIT,
};

#[derive(Parser)]
#[command(name = "tabula")]
#[command(version, about = "Allow-listed query engine for relational tables", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Database backend (sqlite or postgres)
    #[arg(long, global = true, env = ENV_DATABASE_BACKEND, value_parser = parse_backend)]
    pub database_backend: Option<Backend>,

    /// Database connection URL
    #[arg(long, global = true, env = ENV_DATABASE_URL)]
    pub database_url: Option<String>,

    /// Maximum number of pooled connections
    #[arg(long, global = true, env = ENV_DATABASE_MAX_CONNECTIONS)]
    pub database_max_connections: Option<u32>,

    /// Page size used when a request gives none
    #[arg(long, global = true, env = ENV_QUERY_DEFAULT_LIMIT)]
    pub query_default_limit: Option<u32>,

    /// Largest page size a request may ask for
    #[arg(long, global = true, env = ENV_QUERY_MAX_LIMIT)]
    pub query_max_limit: Option<u32>,
}

/// Parse database backend from CLI/env string
fn parse_backend(s: &str) -> Result<Backend, String> {
    match s.to_lowercase().as_str() {
        "sqlite" => Ok(Backend::Sqlite),
        "postgres" | "postgresql" => Ok(Backend::Postgres),
        _ => Err(format!(
            "Invalid database backend '{}'. Valid options: sqlite, postgres",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Query a configured resource and print the result page as JSON
    Query(QueryArgs),
    /// List configured resources and their allowed columns
    Resources,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct QueryArgs {
    /// Resource name from the config file
    pub resource: String,

    /// Page number (1-based)
    #[arg(long)]
    pub page: Option<String>,

    /// Items per page
    #[arg(long, short = 'l')]
    pub limit: Option<String>,

    /// Sort field, prefix with '-' for descending
    #[arg(long, short = 's', allow_hyphen_values = true)]
    pub sort: Option<String>,

    /// Free-text search across allowed columns
    #[arg(long, short = 'q')]
    pub search: Option<String>,

    /// Comma-separated fields to project
    #[arg(long)]
    pub fields: Option<String>,

    /// Filter expression as JSON, e.g. '{"role":{"in":["admin"]}}'
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Include soft-deleted rows
    #[arg(long)]
    pub include_deleted: bool,

    /// Override the resource's allowed columns (comma-separated)
    #[arg(long)]
    pub columns: Option<String>,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub database_backend: Option<Backend>,
    pub database_url: Option<String>,
    pub database_max_connections: Option<u32>,
    pub query_default_limit: Option<u32>,
    pub query_max_limit: Option<u32>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Commands) {
    let cli = Cli::parse();
    let config = CliConfig {
        config: cli.config,
        database_backend: cli.database_backend,
        database_url: cli.database_url,
        database_max_connections: cli.database_max_connections,
        query_default_limit: cli.query_default_limit,
        query_max_limit: cli.query_max_limit,
    };
    (config, cli.command)
}
