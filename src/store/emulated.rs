//! Blob-emulated document store
//!
//! Each collection is one JSON array stored at `db/<collection>.json`.
//! Every operation:
//!
//! 1. takes the collection snapshot from the instance cache, or lists and
//!    reads the blob (no blob, or an empty body, is an empty collection)
//! 2. runs the read or mutation in memory
//! 3. for mutations, serializes the whole collection and overwrites the blob
//! 4. replaces the cached snapshot, only once the write succeeded
//!
//! A per-collection lock is held across those steps, so tasks sharing one
//! store instance always see a consistent snapshot. Nothing coordinates
//! separate instances or processes: two writers working from the same
//! snapshot each overwrite the blob and the later write wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::document::{self, Document, IdGenerator, TimestampIdGenerator, ID_FIELD};
use crate::executor::{PipelineEvaluator, PredicateFilter, UpdateApplier};
use crate::file_storage::{BlobBackend, BlobEntry, BlobError};

use super::errors::{StoreError, StoreResult};
use super::{
    BackendKind, DeleteResult, DocumentStore, InsertManyResult, InsertOneResult, UpdateResult,
};

/// Cached snapshot of one collection; `None` until first loaded
type Slot = Arc<Mutex<Option<Vec<Document>>>>;

/// Document store over a whole-object blob backend
pub struct EmulatedStore {
    blobs: Arc<dyn BlobBackend>,
    ids: Arc<dyn IdGenerator>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl EmulatedStore {
    /// Create a store over `blobs` with the default id generator
    pub fn new(blobs: Arc<dyn BlobBackend>) -> Self {
        Self {
            blobs,
            ids: Arc::new(TimestampIdGenerator::new()),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Use a different identifier generator
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Blob key holding a collection
    pub fn blob_key(collection: &str) -> String {
        format!("db/{}.json", collection)
    }

    /// Drop the cached snapshot of one collection
    pub async fn invalidate(&self, collection: &str) {
        let slot = self.slot(collection).await;
        *slot.lock().await = None;
    }

    /// Drop every cached snapshot
    pub async fn invalidate_all(&self) {
        let slots: Vec<Slot> = self.slots.lock().await.values().cloned().collect();
        for slot in slots {
            *slot.lock().await = None;
        }
    }

    async fn slot(&self, collection: &str) -> Slot {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(collection.to_string()).or_default())
    }

    /// Load a collection from the blob backend
    async fn fetch(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let key = Self::blob_key(collection);
        let unreachable =
            |e: BlobError| StoreError::Connectivity(format!("loading '{}': {}", key, e));

        let entries = self.blobs.list(&key).await.map_err(unreachable)?;
        let Some(entry) = BlobEntry::select(&entries, &key) else {
            debug!(collection, "no blob yet, starting empty");
            return Ok(Vec::new());
        };
        let body = self.blobs.read(entry).await.map_err(unreachable)?;

        let documents = parse_collection(collection, &body)?;
        debug!(collection, documents = documents.len(), "collection loaded");
        Ok(documents)
    }

    /// Overwrite the collection blob with `documents`
    ///
    /// An unreachable or silent backend is a connectivity failure; any
    /// other rejected upload is a write failure.
    async fn persist(&self, collection: &str, documents: &[Document]) -> StoreResult<()> {
        let key = Self::blob_key(collection);
        let body = serde_json::to_vec(documents)
            .map_err(|e| StoreError::write_failed(collection, e.to_string()))?;
        let bytes = body.len();

        self.blobs.write(&key, body).await.map_err(|e| {
            error!(
                collection,
                backend = self.blobs.backend_tag(),
                error = %e,
                "collection write failed"
            );
            if e.is_connectivity() {
                StoreError::Connectivity(format!("writing '{}': {}", key, e))
            } else {
                StoreError::write_failed(collection, e.to_string())
            }
        })?;

        info!(collection, documents = documents.len(), bytes, "collection persisted");
        Ok(())
    }

    /// Run a read against the current snapshot
    ///
    /// A snapshot that cannot be loaded reads as an empty collection and is
    /// not cached, so the next call tries again.
    async fn read<R>(&self, collection: &str, view: impl FnOnce(&[Document]) -> R) -> R {
        let slot = self.slot(collection).await;
        let mut cached = slot.lock().await;

        if let Some(documents) = cached.as_ref() {
            return view(documents);
        }
        match self.fetch(collection).await {
            Ok(documents) => view(cached.insert(documents)),
            Err(e) => {
                error!(collection, error = %e, "collection unavailable, reading as empty");
                view(&[])
            }
        }
    }

    /// Run a mutation: copy the snapshot, change it, write it, then cache it
    ///
    /// If loading fails nothing is written; if writing fails the cached
    /// snapshot is left as it was.
    async fn mutate<R>(
        &self,
        collection: &str,
        change: impl FnOnce(&mut Vec<Document>) -> R,
    ) -> StoreResult<R> {
        let slot = self.slot(collection).await;
        let mut cached = slot.lock().await;

        let mut documents = match cached.as_ref() {
            Some(documents) => documents.clone(),
            None => self.fetch(collection).await?,
        };
        let outcome = change(&mut documents);

        self.persist(collection, &documents).await?;
        *cached = Some(documents);
        Ok(outcome)
    }

    /// Draw an identifier not already used in `documents`
    fn fresh_id(&self, documents: &[Document]) -> String {
        loop {
            let id = self.ids.next_id();
            let taken = documents
                .iter()
                .any(|doc| doc.get(ID_FIELD).and_then(Value::as_str) == Some(id.as_str()));
            if !taken {
                return id;
            }
            warn!(id = %id, "generated id already in use, drawing another");
        }
    }

    /// Append `document` under a fresh id, returning the id
    fn append(&self, documents: &mut Vec<Document>, document: Document) -> String {
        let id = self.fresh_id(documents);
        documents.push(document::with_id(document, &id));
        id
    }
}

/// Parse a collection blob: a JSON array of objects, or an empty body
fn parse_collection(collection: &str, body: &[u8]) -> StoreResult<Vec<Document>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(body).map_err(|e| StoreError::corrupt(collection, e.to_string()))
}

impl fmt::Debug for EmulatedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatedStore")
            .field("blobs", &self.blobs)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DocumentStore for EmulatedStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Emulated
    }

    async fn find(&self, collection: &str, query: Option<&Document>) -> StoreResult<Vec<Document>> {
        Ok(self
            .read(collection, |docs| {
                docs.iter()
                    .filter(|doc| PredicateFilter::matches_optional(doc, query))
                    .cloned()
                    .collect()
            })
            .await)
    }

    async fn find_one(&self, collection: &str, query: &Document) -> StoreResult<Option<Document>> {
        Ok(self
            .read(collection, |docs| {
                docs.iter()
                    .find(|doc| PredicateFilter::matches(doc, query))
                    .cloned()
            })
            .await)
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> StoreResult<InsertOneResult> {
        let inserted_id = self
            .mutate(collection, |docs| self.append(docs, document))
            .await?;
        Ok(InsertOneResult { inserted_id })
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<InsertManyResult> {
        let inserted_ids = self
            .mutate(collection, |docs| {
                documents
                    .into_iter()
                    .map(|document| self.append(docs, document))
                    .collect::<Vec<_>>()
            })
            .await?;
        Ok(InsertManyResult { inserted_ids })
    }

    async fn update_one(
        &self,
        collection: &str,
        query: &Document,
        update: &Document,
        upsert: bool,
    ) -> StoreResult<UpdateResult> {
        self.mutate(collection, |docs| {
            if let Some(doc) = docs.iter_mut().find(|doc| PredicateFilter::matches(doc, query)) {
                return UpdateResult::matched(UpdateApplier::apply(doc, update));
            }
            if upsert {
                let created = UpdateApplier::upsert_document(query, update);
                return UpdateResult::upserted(self.append(docs, created));
            }
            UpdateResult::default()
        })
        .await
    }

    async fn delete_one(&self, collection: &str, query: &Document) -> StoreResult<DeleteResult> {
        self.mutate(collection, |docs| {
            let position = docs.iter().position(|doc| PredicateFilter::matches(doc, query));
            let deleted_count = match position {
                Some(index) => {
                    docs.remove(index);
                    1
                }
                None => 0,
            };
            DeleteResult { deleted_count }
        })
        .await
    }

    async fn delete_many(&self, collection: &str, query: &Document) -> StoreResult<DeleteResult> {
        self.mutate(collection, |docs| {
            let before = docs.len();
            docs.retain(|doc| !PredicateFilter::matches(doc, query));
            DeleteResult {
                deleted_count: (before - docs.len()) as u64,
            }
        })
        .await
    }

    async fn count_documents(
        &self,
        collection: &str,
        query: Option<&Document>,
    ) -> StoreResult<u64> {
        Ok(self
            .read(collection, |docs| {
                docs.iter()
                    .filter(|doc| PredicateFilter::matches_optional(doc, query))
                    .count() as u64
            })
            .await)
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &[Document],
    ) -> StoreResult<Vec<Document>> {
        Ok(self
            .read(collection, |docs| PipelineEvaluator::evaluate(docs.to_vec(), pipeline))
            .await)
    }
}
