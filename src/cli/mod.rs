//! CLI module for docstore
//!
//! Runs single store operations from the command line, mainly for
//! inspecting and seeding collections.

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{execute, load_config, run, run_command};
pub use errors::{CliError, CliResult};
pub use io::{parse_document, parse_documents, write_json};
