//! # Blob Storage Module
//!
//! Whole-object storage backends used by the emulated document store.
//!
//! - [`HttpBlobBackend`]: hosted blob REST API (production)
//! - [`LocalBlobBackend`]: files under a directory (offline development)
//! - [`MemoryBlobBackend`]: process memory (tests)

pub mod backend;
pub mod errors;
pub mod http;
pub mod local;
pub mod memory;

pub use backend::{BlobBackend, BlobEntry};
pub use errors::{BlobError, BlobResult};
pub use http::{HttpBlobBackend, DEFAULT_BLOB_BASE_URL};
pub use local::LocalBlobBackend;
pub use memory::MemoryBlobBackend;
