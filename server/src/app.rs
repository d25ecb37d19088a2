//! Core application

use anyhow::{Context, Result};

use crate::api::ApiError;
use crate::core::cli::{self, CliConfig, Commands, QueryArgs};
use crate::core::config::AppConfig;
use crate::core::constants::{DEFAULT_LOG_FILTER, ENV_LOG};
use crate::data::query::options::StringOrArray;
use crate::data::query::{AllowedColumns, ListParams, QueryEngine, QueryOptions};
use crate::data::store;

pub struct CoreApp {
    pub config: AppConfig,
    pub engine: QueryEngine,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Commands::Resources => {
                let config = AppConfig::load(&cli_config)?;
                Self::print_resources(&config)
            }
            Commands::Query(args) => {
                let app = Self::init(&cli_config).await?;
                app.query(args).await
            }
        }
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let store = store::connect(&config.database).await.with_context(|| {
            format!(
                "Failed to connect to {} database",
                config.database.backend
            )
        })?;
        tracing::debug!(backend = %store.backend(), "Store connected");

        let engine = QueryEngine::new(store, config.query.clone());
        Ok(Self { config, engine })
    }

    /// Run one list request and print the page, or the error body on a client error
    async fn query(&self, args: QueryArgs) -> Result<()> {
        let Some(resource) = self.config.resource(&args.resource) else {
            return Self::report(ApiError::not_found(
                "RESOURCE_NOT_FOUND",
                format!("Unknown resource: {}", args.resource),
            ));
        };
        let table = resource
            .descriptor()
            .with_context(|| format!("Invalid resource '{}'", resource.name))?;
        let allowed = match &args.columns {
            Some(columns) => AllowedColumns::new(
                columns.split(',').map(str::trim).filter(|c| !c.is_empty()),
            ),
            None => resource.allowed(),
        };

        let options = match QueryOptions::from_params(list_params(&args), self.engine.config()) {
            Ok(options) => options,
            Err(e) => return Self::report(ApiError::from(e)),
        };
        tracing::debug!(
            resource = %resource.name,
            page = options.page,
            limit = options.limit,
            "Running query"
        );

        match self.engine.search(&table, &allowed, &options).await {
            Ok(page) => {
                println!("{}", serde_json::to_string_pretty(&page)?);
                Ok(())
            }
            Err(e) => Self::report(ApiError::from(e)),
        }
    }

    /// Print an error body and fail with its message
    fn report(error: ApiError) -> Result<()> {
        let body = error.body();
        println!("{}", serde_json::to_string_pretty(&body)?);
        anyhow::bail!(
            "{} ({})",
            body["message"].as_str().unwrap_or("Query failed"),
            error.status()
        )
    }

    fn print_resources(config: &AppConfig) -> Result<()> {
        if config.resources.is_empty() {
            println!("No resources configured.");
            return Ok(());
        }
        for resource in &config.resources {
            let allowed = resource.allowed();
            let allowed: Vec<&str> = allowed.iter().collect();
            println!(
                "{} -> {}{}",
                resource.name,
                resource.table,
                resource
                    .soft_delete_column
                    .as_deref()
                    .map(|c| format!(" (soft delete: {})", c))
                    .unwrap_or_default()
            );
            println!("  allowed: {}", allowed.join(", "));
        }
        Ok(())
    }

    fn init_logging() {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// CLI flags in the same loose shape an HTTP query string would have
fn list_params(args: &QueryArgs) -> ListParams {
    ListParams {
        page: args.page.clone().map(serde_json::Value::String),
        limit: args.limit.clone().map(serde_json::Value::String),
        sort: args.sort.clone(),
        search: args.search.clone(),
        fields: args.fields.clone().map(StringOrArray::Single),
        filter: args.filter.clone().map(serde_json::Value::String),
        include_deleted: args
            .include_deleted
            .then_some(serde_json::Value::Bool(true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::QueryConfig;

    #[test]
    fn test_list_params_from_cli_args() {
        let args = QueryArgs {
            resource: "users".into(),
            page: Some("3".into()),
            limit: Some("oops".into()),
            sort: Some("-created_at".into()),
            fields: Some("name,email".into()),
            filter: Some(r#"{"role":{"in":"admin,user"}}"#.into()),
            include_deleted: true,
            ..QueryArgs::default()
        };
        let options =
            QueryOptions::from_params(list_params(&args), &QueryConfig::default()).unwrap();
        assert_eq!(options.page, 3);
        assert_eq!(options.limit, 20);
        assert!(!options.exclude_soft_deleted);
        assert_eq!(
            options.fields,
            Some(vec!["name".to_string(), "email".to_string()])
        );
        assert_eq!(
            options.filter,
            Some(serde_json::json!({ "role": { "in": "admin,user" } }))
        );
    }

    #[test]
    fn test_report_fails_with_message() {
        let err = CoreApp::report(ApiError::bad_request("INVALID_SORT_FIELD", "Invalid sort field: x"))
            .unwrap_err();
        assert!(err.to_string().contains("Invalid sort field: x"));
    }
}
