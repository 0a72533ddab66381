//! MongoDB-backed document store
//!
//! Translates the store contract onto a real database:
//!
//! - documents leave the database with `_id` renamed to a string `id`,
//!   placed first
//! - an `id` (or string `_id`) in a query becomes an `ObjectId` when it
//!   parses as one, and stays a plain string otherwise
//! - inserts drop any caller `id` so the database assigns one
//! - updates are always sent as `$set`, never touching the identity field

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Bson, Document as BsonDocument};
use futures_util::TryStreamExt;
use mongodb::error::{Error as DriverError, ErrorKind};
use mongodb::{Client, Collection, Database};
use serde_json::Value;
use tracing::{debug, info};

use crate::document::{is_id_field, Document, ID_FIELD, NATIVE_ID_FIELD as NATIVE_ID};
use crate::executor::{UpdateApplier, OR_KEY, SET_KEY};

use super::errors::{StoreError, StoreResult};
use super::{
    BackendKind, DeleteResult, DocumentStore, InsertManyResult, InsertOneResult, UpdateResult,
};

const MATCH_STAGE: &str = "$match";

/// Outcome of converting an interface identifier to the database type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdCoercion {
    /// Parsed as an `ObjectId`
    Native(ObjectId),
    /// Not an `ObjectId`; the original string is used as is and will
    /// usually match nothing
    Fallback(String),
}

impl IdCoercion {
    /// Try to convert `raw`; never fails
    pub fn parse(raw: &str) -> Self {
        match ObjectId::parse_str(raw) {
            Ok(oid) => IdCoercion::Native(oid),
            Err(_) => IdCoercion::Fallback(raw.to_string()),
        }
    }

    /// Value to put in a database filter
    pub fn into_bson(self) -> Bson {
        match self {
            IdCoercion::Native(oid) => Bson::ObjectId(oid),
            IdCoercion::Fallback(raw) => Bson::String(raw),
        }
    }
}

/// Document store over a MongoDB database
#[derive(Debug, Clone)]
pub struct NativeStore {
    database: Database,
}

impl NativeStore {
    /// Open a client for `url` and use database `name`
    ///
    /// The driver connects lazily; an unreachable server surfaces on the
    /// first operation.
    pub async fn connect(url: &str, name: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(url)
            .await
            .map_err(|e| StoreError::Config(format!("invalid database url: {}", e)))?;
        info!(database = name, "native store opened");
        Ok(Self::from_database(client.database(name)))
    }

    /// Wrap an existing database handle
    pub fn from_database(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection(name)
    }
}

fn to_bson(value: &Value) -> StoreResult<Bson> {
    bson::to_bson(value).map_err(|e| StoreError::Rejected(format!("value not storable: {}", e)))
}

/// Identity value for a query: strings go through [`IdCoercion`]
fn query_id(value: &Value) -> StoreResult<Bson> {
    match value {
        Value::String(raw) => {
            let coerced = IdCoercion::parse(raw);
            if let IdCoercion::Fallback(raw) = &coerced {
                debug!(id = %raw, "id is not an ObjectId, querying with the raw string");
            }
            Ok(coerced.into_bson())
        }
        other => to_bson(other),
    }
}

/// Query specification -> database filter
fn translate_query(query: &Document) -> StoreResult<BsonDocument> {
    let mut filter = BsonDocument::new();
    for (field, value) in query {
        match field.as_str() {
            ID_FIELD | NATIVE_ID => {
                filter.insert(NATIVE_ID, query_id(value)?);
            }
            OR_KEY => {
                filter.insert(OR_KEY, translate_or(value)?);
            }
            _ => {
                filter.insert(field.as_str(), to_bson(value)?);
            }
        }
    }
    Ok(filter)
}

fn translate_or(branches: &Value) -> StoreResult<Bson> {
    let Value::Array(branches) = branches else {
        return to_bson(branches);
    };
    branches
        .iter()
        .map(|branch| match branch {
            Value::Object(conditions) => translate_query(conditions).map(Bson::Document),
            other => to_bson(other),
        })
        .collect::<StoreResult<Vec<_>>>()
        .map(Bson::Array)
}

/// Update specification -> `{"$set": {...}}` without identity fields
fn translate_update(update: &Document) -> StoreResult<BsonDocument> {
    let mut set = BsonDocument::new();
    if let Some(fields) = UpdateApplier::set_fields(update) {
        for (field, value) in fields {
            if is_id_field(field) {
                continue;
            }
            set.insert(field.as_str(), to_bson(value)?);
        }
    }
    Ok(doc! { SET_KEY: set })
}

/// Document to insert, without caller identity fields
fn translate_insert(document: &Document) -> StoreResult<BsonDocument> {
    let mut out = BsonDocument::new();
    for (field, value) in document {
        if is_id_field(field) {
            continue;
        }
        out.insert(field.as_str(), to_bson(value)?);
    }
    Ok(out)
}

/// Pipeline stages; `$match` stages get the same id handling as queries
fn translate_pipeline(pipeline: &[Document]) -> StoreResult<Vec<BsonDocument>> {
    pipeline
        .iter()
        .map(|stage| match stage.get(MATCH_STAGE) {
            Some(Value::Object(conditions)) => {
                Ok(doc! { MATCH_STAGE: translate_query(conditions)? })
            }
            _ => bson::to_document(stage)
                .map_err(|e| StoreError::Rejected(format!("invalid pipeline stage: {}", e))),
        })
        .collect()
}

/// Stringified database identifier
fn id_string(id: Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(raw) => raw,
        other => other.into_relaxed_extjson().to_string(),
    }
}

/// Database document -> interface document with `id` first
fn from_native(mut native: BsonDocument) -> Document {
    let mut out = Document::with_capacity(native.len());
    if let Some(id) = native.remove(NATIVE_ID) {
        out.insert(ID_FIELD.to_string(), Value::String(id_string(id)));
    }
    for (field, value) in native {
        out.insert(field, value.into_relaxed_extjson());
    }
    out
}

/// Aggregation output: only a non-null `_id` is renamed
fn from_native_aggregate(native: BsonDocument) -> Document {
    let keyed = !matches!(native.get(NATIVE_ID), Some(Bson::Null) | None);
    if keyed {
        return from_native(native);
    }
    native
        .into_iter()
        .map(|(field, value)| (field, value.into_relaxed_extjson()))
        .collect()
}

fn driver_error(collection: &str, write: bool, e: DriverError) -> StoreError {
    match e.kind.as_ref() {
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. } => StoreError::Connectivity(e.to_string()),
        _ if write => StoreError::write_failed(collection, e.to_string()),
        _ => StoreError::Rejected(e.to_string()),
    }
}

#[async_trait]
impl DocumentStore for NativeStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Native
    }

    async fn find(&self, collection: &str, query: Option<&Document>) -> StoreResult<Vec<Document>> {
        let filter = match query {
            Some(query) => translate_query(query)?,
            None => BsonDocument::new(),
        };
        let cursor = self
            .collection(collection)
            .find(filter)
            .await
            .map_err(|e| driver_error(collection, false, e))?;
        let found: Vec<BsonDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| driver_error(collection, false, e))?;
        Ok(found.into_iter().map(from_native).collect())
    }

    async fn find_one(&self, collection: &str, query: &Document) -> StoreResult<Option<Document>> {
        let found = self
            .collection(collection)
            .find_one(translate_query(query)?)
            .await
            .map_err(|e| driver_error(collection, false, e))?;
        Ok(found.map(from_native))
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> StoreResult<InsertOneResult> {
        let result = self
            .collection(collection)
            .insert_one(translate_insert(&document)?)
            .await
            .map_err(|e| driver_error(collection, true, e))?;
        Ok(InsertOneResult {
            inserted_id: id_string(result.inserted_id),
        })
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<InsertManyResult> {
        if documents.is_empty() {
            return Ok(InsertManyResult::default());
        }
        let native = documents
            .iter()
            .map(translate_insert)
            .collect::<StoreResult<Vec<_>>>()?;

        let result = self
            .collection(collection)
            .insert_many(native)
            .await
            .map_err(|e| driver_error(collection, true, e))?;

        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        Ok(InsertManyResult {
            inserted_ids: ids.into_iter().map(|(_, id)| id_string(id)).collect(),
        })
    }

    async fn update_one(
        &self,
        collection: &str,
        query: &Document,
        update: &Document,
        upsert: bool,
    ) -> StoreResult<UpdateResult> {
        let result = self
            .collection(collection)
            .update_one(translate_query(query)?, translate_update(update)?)
            .upsert(upsert)
            .await
            .map_err(|e| driver_error(collection, true, e))?;
        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id.map(id_string),
        })
    }

    async fn delete_one(&self, collection: &str, query: &Document) -> StoreResult<DeleteResult> {
        let result = self
            .collection(collection)
            .delete_one(translate_query(query)?)
            .await
            .map_err(|e| driver_error(collection, true, e))?;
        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }

    async fn delete_many(&self, collection: &str, query: &Document) -> StoreResult<DeleteResult> {
        let result = self
            .collection(collection)
            .delete_many(translate_query(query)?)
            .await
            .map_err(|e| driver_error(collection, true, e))?;
        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }

    async fn count_documents(
        &self,
        collection: &str,
        query: Option<&Document>,
    ) -> StoreResult<u64> {
        let filter = match query {
            Some(query) => translate_query(query)?,
            None => BsonDocument::new(),
        };
        self.collection(collection)
            .count_documents(filter)
            .await
            .map_err(|e| driver_error(collection, false, e))
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &[Document],
    ) -> StoreResult<Vec<Document>> {
        let cursor = self
            .collection(collection)
            .aggregate(translate_pipeline(pipeline)?)
            .await
            .map_err(|e| driver_error(collection, false, e))?;
        let out: Vec<BsonDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| driver_error(collection, false, e))?;
        Ok(out.into_iter().map(from_native_aggregate).collect())
    }
}
