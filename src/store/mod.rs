//! Document store interface
//!
//! [`DocumentStore`] is the one contract application code uses. Two
//! implementations exist:
//!
//! - [`EmulatedStore`]: collections kept as whole JSON blobs, queried and
//!   updated in memory
//! - [`NativeStore`]: a MongoDB database (cargo feature `mongodb`)
//!
//! [`select_store`] picks one from configuration at startup.

mod emulated;
mod errors;
#[cfg(feature = "mongodb")]
mod native;
mod selector;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::Document;

pub use emulated::EmulatedStore;
pub use errors::{StoreError, StoreResult};
#[cfg(feature = "mongodb")]
pub use native::{IdCoercion, NativeStore};
pub use selector::{global, init_global, select_store};

/// Which backend a store runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Emulated,
    Native,
}

impl BackendKind {
    /// Lowercase name, as accepted by `DOCSTORE_BACKEND`
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Emulated => "emulated",
            BackendKind::Native => "native",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "emulated" | "blob" => Ok(BackendKind::Emulated),
            "native" | "mongodb" => Ok(BackendKind::Native),
            other => Err(format!("unknown backend '{}', expected 'emulated' or 'native'", other)),
        }
    }
}

/// Result of `insert_one`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertOneResult {
    pub inserted_id: String,
}

/// Result of `insert_many`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InsertManyResult {
    pub inserted_ids: Vec<String>,
}

/// Result of `update_one`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<String>,
}

impl UpdateResult {
    /// One document matched; `modified` if any field value changed
    pub fn matched(modified: bool) -> Self {
        Self {
            matched_count: 1,
            modified_count: u64::from(modified),
            upserted_id: None,
        }
    }

    /// Nothing matched and a document was inserted instead
    pub fn upserted(id: String) -> Self {
        Self {
            upserted_id: Some(id),
            ..Self::default()
        }
    }
}

/// Result of `delete_one` / `delete_many`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Uniform document store contract
///
/// Queries are equality maps with an optional flat `$or`; updates are
/// `$set` or flat field merges; aggregation understands `$match` and a
/// null-key `$group` with `$sum`. Anything else is outside the contract:
/// the emulated backend never matches it, the native backend passes it on.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend this store runs on (diagnostics only)
    fn backend(&self) -> BackendKind;

    /// All matching documents in insertion order
    async fn find(&self, collection: &str, query: Option<&Document>) -> StoreResult<Vec<Document>>;

    /// First matching document
    async fn find_one(&self, collection: &str, query: &Document) -> StoreResult<Option<Document>>;

    /// Insert one document under a fresh `id`
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> StoreResult<InsertOneResult>;

    /// Insert documents in order with one write
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<InsertManyResult>;

    /// Merge `update` into the first match, or insert when `upsert` is set
    async fn update_one(
        &self,
        collection: &str,
        query: &Document,
        update: &Document,
        upsert: bool,
    ) -> StoreResult<UpdateResult>;

    /// Delete the first match
    async fn delete_one(&self, collection: &str, query: &Document) -> StoreResult<DeleteResult>;

    /// Delete every match
    async fn delete_many(&self, collection: &str, query: &Document) -> StoreResult<DeleteResult>;

    /// Number of matching documents
    async fn count_documents(&self, collection: &str, query: Option<&Document>) -> StoreResult<u64>;

    /// Run an aggregation pipeline
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &[Document],
    ) -> StoreResult<Vec<Document>>;
}
