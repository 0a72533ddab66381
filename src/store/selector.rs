//! Backend selection
//!
//! Picks and opens the store once from configuration. The same decision
//! is used for the whole process lifetime.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use crate::config::StoreConfig;
use crate::file_storage::{BlobBackend, HttpBlobBackend, LocalBlobBackend};

use super::errors::{StoreError, StoreResult};
use super::{BackendKind, DocumentStore, EmulatedStore};

static GLOBAL: OnceCell<Arc<dyn DocumentStore>> = OnceCell::const_new();

/// Open the store the configuration selects
pub async fn select_store(config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
    let kind = config.selected_backend();
    let store: Arc<dyn DocumentStore> = match kind {
        BackendKind::Emulated => Arc::new(EmulatedStore::new(open_blobs(config)?)),
        BackendKind::Native => open_native(config).await?,
    };
    info!(backend = %kind, "document store selected");
    Ok(store)
}

/// Open the process-wide store on first call; later calls return it
pub async fn init_global(config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
    GLOBAL
        .get_or_try_init(|| select_store(config))
        .await
        .map(Arc::clone)
}

/// The process-wide store, if [`init_global`] has succeeded
pub fn global() -> Option<Arc<dyn DocumentStore>> {
    GLOBAL.get().cloned()
}

fn open_blobs(config: &StoreConfig) -> StoreResult<Arc<dyn BlobBackend>> {
    if let Some(dir) = &config.blob.local_dir {
        return Ok(Arc::new(LocalBlobBackend::new(dir.clone())));
    }
    if !config.blob.has_token() {
        return Err(StoreError::Config(
            "emulated backend needs a blob token or a local blob directory".to_string(),
        ));
    }
    let backend = HttpBlobBackend::new(
        config.blob.base_url.clone(),
        config.blob.token.clone(),
        config.blob.timeout(),
    )
    .map_err(|e| StoreError::Config(e.to_string()))?;
    Ok(Arc::new(backend))
}

#[cfg(feature = "mongodb")]
async fn open_native(config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
    let store = super::NativeStore::connect(&config.native.url, &config.native.database).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "mongodb"))]
async fn open_native(_config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
    Err(StoreError::Config(
        "native backend not compiled in (enable the `mongodb` feature)".to_string(),
    ))
}
