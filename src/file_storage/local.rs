//! # Local Filesystem Backend
//!
//! Stores each key as a file under a root directory. A listing returns the
//! key itself when its file exists; other files sharing the prefix are not
//! reported.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;

use super::backend::{BlobBackend, BlobEntry};
use super::errors::{BlobError, BlobResult};

/// Local filesystem blob backend
#[derive(Debug)]
pub struct LocalBlobBackend {
    root: PathBuf,
}

impl LocalBlobBackend {
    /// Create a new local backend
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to a file path, refusing anything that escapes the root
    fn full_path(&self, pathname: &str) -> BlobResult<PathBuf> {
        let relative = Path::new(pathname);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if pathname.is_empty() || escapes {
            return Err(BlobError::InvalidPath(pathname.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobBackend for LocalBlobBackend {
    fn backend_tag(&self) -> &'static str {
        "local"
    }

    async fn list(&self, prefix: &str) -> BlobResult<Vec<BlobEntry>> {
        let full_path = self.full_path(prefix)?;

        match fs::metadata(&full_path).await {
            Ok(meta) if meta.is_file() => Ok(vec![BlobEntry {
                url: format!("file://{}", full_path.display()),
                pathname: prefix.to_string(),
                uploaded_at: meta.modified().ok().map(DateTime::<Utc>::from),
            }]),
            Ok(_) => Ok(Vec::new()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, entry: &BlobEntry) -> BlobResult<Vec<u8>> {
        let full_path = self.full_path(&entry.pathname)?;
        Ok(fs::read(&full_path).await?)
    }

    async fn write(&self, pathname: &str, data: Vec<u8>) -> BlobResult<()> {
        let full_path = self.full_path(pathname)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Readers never see a half-written file
        let staging = full_path.with_extension("json.tmp");
        fs::write(&staging, data).await?;
        fs::rename(&staging, &full_path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_list_read() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBlobBackend::new(temp.path());

        backend.write("db/products.json", b"[]".to_vec()).await.unwrap();
        let entries = backend.list("db/products.json").await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pathname, "db/products.json");
        assert!(entries[0].uploaded_at.is_some());
        assert_eq!(backend.read(&entries[0]).await.unwrap(), b"[]");
    }

    #[tokio::test]
    async fn test_overwrite() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBlobBackend::new(temp.path());

        backend.write("db/a.json", b"[1]".to_vec()).await.unwrap();
        backend.write("db/a.json", b"[2]".to_vec()).await.unwrap();

        let entries = backend.list("db/a.json").await.unwrap();
        assert_eq!(backend.read(&entries[0]).await.unwrap(), b"[2]");
        assert!(!temp.path().join("db/a.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_key_lists_empty() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBlobBackend::new(temp.path());

        assert!(backend.list("db/none.json").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_path_escape_rejected() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBlobBackend::new(temp.path());

        let result = backend.write("db/../../etc.json", b"[]".to_vec()).await;
        assert!(matches!(result, Err(BlobError::InvalidPath(_))));
        assert!(matches!(backend.list("/abs.json").await, Err(BlobError::InvalidPath(_))));
    }
}
