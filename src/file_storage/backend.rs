//! # Blob Backend Trait
//!
//! Whole-object storage: list keys by prefix, read an object, overwrite an
//! object. No partial writes, no conditional writes.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::BlobResult;

/// One object as reported by a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobEntry {
    /// Location the object content can be fetched from
    pub url: String,

    /// Object key
    #[serde(default)]
    pub pathname: String,

    /// Upload time, when the backend reports one
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl BlobEntry {
    /// Picks the entry holding `key` out of a prefix listing
    ///
    /// Exact pathname matches win, newest upload first (ties keep listing
    /// order). Without an exact match the first listed entry is used.
    pub fn select<'a>(entries: &'a [BlobEntry], key: &str) -> Option<&'a BlobEntry> {
        let exact = entries
            .iter()
            .filter(|e| e.pathname == key)
            .fold(None::<&BlobEntry>, |best, e| match best {
                Some(b) if e.uploaded_at <= b.uploaded_at => Some(b),
                _ => Some(e),
            });
        exact.or_else(|| entries.first())
    }
}

/// Backend trait for whole-object blob storage
#[async_trait]
pub trait BlobBackend: Send + Sync + fmt::Debug {
    /// Short name used in logs
    fn backend_tag(&self) -> &'static str;

    /// List objects whose key starts with `prefix`
    async fn list(&self, prefix: &str) -> BlobResult<Vec<BlobEntry>>;

    /// Read the full content of a listed object
    async fn read(&self, entry: &BlobEntry) -> BlobResult<Vec<u8>>;

    /// Overwrite the object at `pathname` with `data` (JSON)
    async fn write(&self, pathname: &str, data: Vec<u8>) -> BlobResult<()>;
}
