//! CLI command implementations
//!
//! Each invocation loads configuration, opens the selected store once and
//! runs a single operation. Results are printed as JSON.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, to_value, Value};

use crate::config::StoreConfig;
use crate::observability::init_logging;
use crate::store::{select_store, DocumentStore};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{parse_document, parse_documents, parse_optional, write_json};

/// Parse arguments and run the command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_logging(cli.log_format).map_err(|e| CliError::Runtime(e.to_string()))?;
    run_command(cli.config.as_deref(), cli.command)
}

/// Run a command against the configured store
pub fn run_command(config_path: Option<&Path>, command: Command) -> CliResult<()> {
    let config = load_config(config_path)?;

    if let Command::Backend = command {
        return write_json(&json!({ "backend": config.selected_backend() }));
    }

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Runtime(format!("failed to create tokio runtime: {}", e)))?;

    let output = rt.block_on(async {
        let store = select_store(&config).await?;
        execute(store, command).await
    })?;

    write_json(&output)
}

/// Configuration from a file when given, the environment otherwise
pub fn load_config(path: Option<&Path>) -> CliResult<StoreConfig> {
    let config = match path {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::from_env()?,
    };
    Ok(config)
}

/// Run one store operation and return its JSON result
pub async fn execute(store: Arc<dyn DocumentStore>, command: Command) -> CliResult<Value> {
    let output = match command {
        Command::Backend => json!({ "backend": store.backend() }),
        Command::Find { collection, query } => {
            let query = parse_optional(query.as_deref())?;
            to_value(store.find(&collection, query.as_ref()).await?)?
        }
        Command::FindOne { collection, query } => {
            to_value(store.find_one(&collection, &parse_document(&query)?).await?)?
        }
        Command::Insert { collection, document } => {
            to_value(store.insert_one(&collection, parse_document(&document)?).await?)?
        }
        Command::InsertMany { collection, documents } => {
            to_value(store.insert_many(&collection, parse_documents(&documents)?).await?)?
        }
        Command::Update {
            collection,
            query,
            update,
            upsert,
        } => {
            let query = parse_document(&query)?;
            let update = parse_document(&update)?;
            to_value(store.update_one(&collection, &query, &update, upsert).await?)?
        }
        Command::Delete {
            collection,
            query,
            many,
        } => {
            let query = parse_document(&query)?;
            let result = if many {
                store.delete_many(&collection, &query).await?
            } else {
                store.delete_one(&collection, &query).await?
            };
            to_value(result)?
        }
        Command::Count { collection, query } => {
            let query = parse_optional(query.as_deref())?;
            json!({ "count": store.count_documents(&collection, query.as_ref()).await? })
        }
        Command::Aggregate { collection, pipeline } => {
            to_value(store.aggregate(&collection, &parse_documents(&pipeline)?).await?)?
        }
    };
    Ok(output)
}
