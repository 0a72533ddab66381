//! # In-Memory Backend
//!
//! Keeps objects in process memory. Several stores can share one instance
//! (behind an `Arc`) to stand in for a shared remote namespace, and writes
//! can be made to fail on demand.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::backend::{BlobBackend, BlobEntry};
use super::errors::{BlobError, BlobResult};

const URL_SCHEME: &str = "memory://";

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Vec<u8>,
    uploaded_at: DateTime<Utc>,
}

/// In-memory blob backend
#[derive(Debug, Default)]
pub struct MemoryBlobBackend {
    objects: Mutex<BTreeMap<String, StoredBlob>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryBlobBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<String, StoredBlob>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make subsequent writes fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw content stored at `pathname`
    pub fn get(&self, pathname: &str) -> Option<Vec<u8>> {
        self.objects().get(pathname).map(|b| b.data.clone())
    }

    /// Store content directly, bypassing failure injection and the write count
    pub fn put(&self, pathname: &str, data: impl Into<Vec<u8>>) {
        self.objects().insert(
            pathname.to_string(),
            StoredBlob {
                data: data.into(),
                uploaded_at: Utc::now(),
            },
        );
    }
}

#[async_trait]
impl BlobBackend for MemoryBlobBackend {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn list(&self, prefix: &str) -> BlobResult<Vec<BlobEntry>> {
        Ok(self
            .objects()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, blob)| BlobEntry {
                url: format!("{}{}", URL_SCHEME, key),
                pathname: key.clone(),
                uploaded_at: Some(blob.uploaded_at),
            })
            .collect())
    }

    async fn read(&self, entry: &BlobEntry) -> BlobResult<Vec<u8>> {
        self.get(&entry.pathname)
            .ok_or_else(|| BlobError::NotFound(entry.url.clone()))
    }

    async fn write(&self, pathname: &str, data: Vec<u8>) -> BlobResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BlobError::Status {
                operation: "write",
                status: 503,
            });
        }
        self.put(pathname, data);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
