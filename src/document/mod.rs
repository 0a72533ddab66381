//! Documents and identifiers
//!
//! A document is an ordered JSON object. Field order is kept as inserted
//! (serde_json `preserve_order`), but only the position of `id` is ever
//! relied upon.

pub mod id;

use serde_json::{Map, Value};

pub use id::{IdGenerator, TimestampIdGenerator};

/// A single stored record
pub type Document = Map<String, Value>;

/// Field holding the document identifier at the store interface
pub const ID_FIELD: &str = "id";

/// Database-side identifier name, accepted in queries as an alias of `id`
pub const NATIVE_ID_FIELD: &str = "_id";

/// True for either spelling of the identifier field
pub fn is_id_field(field: &str) -> bool {
    field == ID_FIELD || field == NATIVE_ID_FIELD
}

/// Builds a document from a JSON value, if it is an object
pub fn from_value(value: Value) -> Option<Document> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Returns a copy of `document` with `id` set as its first field
///
/// Any identifier the caller supplied, under either name, is dropped.
pub fn with_id(document: Document, id: &str) -> Document {
    let mut out = Document::with_capacity(document.len() + 1);
    out.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    for (key, value) in document {
        if !is_id_field(&key) {
            out.insert(key, value);
        }
    }
    out
}
