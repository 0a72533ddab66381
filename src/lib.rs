//! docstore - one document-store interface over two backends
//!
//! - a native MongoDB database (cargo feature `mongodb`, on by default)
//! - an emulated store keeping each collection as a single JSON blob,
//!   with queries, updates and aggregations evaluated in memory
//!
//! Application code depends only on [`DocumentStore`]; the backend is
//! chosen once at startup by [`select_store`] from [`StoreConfig`].

pub mod cli;
pub mod config;
pub mod document;
pub mod executor;
pub mod file_storage;
pub mod observability;
pub mod store;

pub use config::StoreConfig;
pub use document::Document;
pub use store::{
    select_store, BackendKind, DeleteResult, DocumentStore, EmulatedStore, InsertManyResult,
    InsertOneResult, StoreError, StoreResult, UpdateResult,
};
