//! CLI-specific error types

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("runtime failed to start: {0}")]
    Runtime(String),
}

impl CliError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CLI_CONFIG_ERROR",
            Self::InvalidArgument(_) => "CLI_INVALID_ARGUMENT",
            Self::Store(e) => e.code(),
            Self::Io(_) => "CLI_IO_ERROR",
            Self::Runtime(_) => "CLI_RUNTIME_ERROR",
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidArgument(format!("JSON error: {}", e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
