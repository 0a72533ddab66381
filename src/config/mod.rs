//! Store configuration
//!
//! Loaded once at startup, either from the environment or from a JSON file.
//! Environment variables:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `VERCEL`, `VERCEL_ENV` | either set: blob-enabled deployment |
//! | `BLOB_READ_WRITE_TOKEN` | blob storage token |
//! | `BLOB_BASE_URL` | blob REST endpoint |
//! | `BLOB_TIMEOUT_SECS` | per-request blob timeout |
//! | `BLOB_LOCAL_DIR` | keep blobs in a local directory instead |
//! | `MONGO_URL`, `DB_NAME` | native database connection |
//! | `DOCSTORE_BACKEND` | `emulated` or `native`, overrides selection |

mod errors;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::file_storage::DEFAULT_BLOB_BASE_URL;
use crate::store::BackendKind;

pub use errors::{ConfigError, ConfigResult};

/// Blob backend settings for the emulated store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    /// REST endpoint (default: hosted blob store)
    #[serde(default = "default_blob_base_url")]
    pub base_url: String,

    /// Bearer token; empty means unset
    #[serde(default)]
    pub token: String,

    /// Fixed timeout per request, in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Store blobs as files under this directory instead of the REST API
    #[serde(default)]
    pub local_dir: Option<PathBuf>,
}

fn default_blob_base_url() -> String {
    DEFAULT_BLOB_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            base_url: default_blob_base_url(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
            local_dir: None,
        }
    }
}

impl BlobConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// True when a storage token is configured
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }
}

/// Native database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeConfig {
    /// Connection string (default: "mongodb://localhost:27017")
    #[serde(default = "default_native_url")]
    pub url: String,

    /// Database name (default: "autoparts_ecommerce")
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_native_url() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "autoparts_ecommerce".to_string()
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            url: default_native_url(),
            database: default_database(),
        }
    }
}

/// Top-level store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Explicit backend choice; `None` selects automatically
    #[serde(default)]
    pub backend: Option<BackendKind>,

    /// Running in the blob-enabled deployment mode
    #[serde(default)]
    pub blob_deployment: bool,

    #[serde(default)]
    pub blob: BlobConfig,

    #[serde(default)]
    pub native: NativeConfig,
}

impl StoreConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;

        let config: StoreConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from a variable lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let backend = match var("DOCSTORE_BACKEND") {
            Some(raw) => Some(raw.parse::<BackendKind>().map_err(|reason| {
                ConfigError::invalid("DOCSTORE_BACKEND", reason)
            })?),
            None => None,
        };

        let timeout_secs = match var("BLOB_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| ConfigError::invalid("BLOB_TIMEOUT_SECS", e.to_string()))?,
            None => default_timeout_secs(),
        };

        let config = StoreConfig {
            backend,
            blob_deployment: var("VERCEL").is_some() || var("VERCEL_ENV").is_some(),
            blob: BlobConfig {
                base_url: var("BLOB_BASE_URL").unwrap_or_else(default_blob_base_url),
                token: var("BLOB_READ_WRITE_TOKEN").unwrap_or_default(),
                timeout_secs,
                local_dir: var("BLOB_LOCAL_DIR").map(PathBuf::from),
            },
            native: NativeConfig {
                url: var("MONGO_URL").unwrap_or_else(default_native_url),
                database: var("DB_NAME").unwrap_or_else(default_database),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate field values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.blob.timeout_secs == 0 {
            return Err(ConfigError::invalid("blob.timeout_secs", "must be > 0"));
        }
        if self.native.database.is_empty() {
            return Err(ConfigError::invalid("native.database", "must not be empty"));
        }
        Ok(())
    }

    /// Backend the selector will open
    ///
    /// Without an explicit choice: emulated only in the blob-enabled
    /// deployment mode with a token present, native otherwise.
    pub fn selected_backend(&self) -> BackendKind {
        match self.backend {
            Some(kind) => kind,
            None if self.blob_deployment && self.blob.has_token() => BackendKind::Emulated,
            None => BackendKind::Native,
        }
    }
}
