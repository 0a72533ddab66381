//! CLI argument definitions using clap
//!
//! Commands:
//! - docstore backend
//! - docstore find <collection> [query]
//! - docstore find-one <collection> <query>
//! - docstore insert <collection> <document>
//! - docstore insert-many <collection> <documents>
//! - docstore update <collection> <query> <update> [--upsert]
//! - docstore delete <collection> <query> [--many]
//! - docstore count <collection> [query]
//! - docstore aggregate <collection> <pipeline>
//!
//! JSON arguments are given inline; `-` reads them from stdin.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::observability::LogFormat;

/// docstore - one document-store interface over MongoDB or blob storage
#[derive(Parser, Debug)]
#[command(name = "docstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file (default: read the environment)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the backend the configuration selects
    Backend,

    /// List documents matching a query
    Find {
        collection: String,
        /// Query object (default: everything)
        query: Option<String>,
    },

    /// Print the first document matching a query, or null
    FindOne { collection: String, query: String },

    /// Insert one document
    Insert { collection: String, document: String },

    /// Insert an array of documents
    InsertMany { collection: String, documents: String },

    /// Merge fields into the first matching document
    Update {
        collection: String,
        query: String,
        update: String,
        /// Insert a new document when nothing matches
        #[arg(long)]
        upsert: bool,
    },

    /// Delete the first matching document
    Delete {
        collection: String,
        query: String,
        /// Delete every matching document
        #[arg(long)]
        many: bool,
    },

    /// Count documents matching a query
    Count {
        collection: String,
        query: Option<String>,
    },

    /// Run an aggregation pipeline (JSON array of stages)
    Aggregate { collection: String, pipeline: String },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
