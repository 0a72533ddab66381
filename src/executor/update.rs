//! Update specification interpreter
//!
//! Updates are field merges: `$set` pairs (or, without `$set`, every pair of
//! the specification) are written into the document. Nothing is removed and
//! no other operators exist. The identifier is never rewritten.

use serde_json::Value;

use crate::document::{is_id_field, Document};

/// Reserved update key holding the fields to merge
pub const SET_KEY: &str = "$set";

/// Applies update specifications to documents
pub struct UpdateApplier;

impl UpdateApplier {
    /// Returns the field/value pairs an update will merge
    ///
    /// A non-object `$set` contributes no fields.
    pub fn set_fields(update: &Document) -> Option<&Document> {
        match update.get(SET_KEY) {
            Some(Value::Object(fields)) => Some(fields),
            Some(_) => None,
            None => Some(update),
        }
    }

    /// Merges the update into `document`, returning whether any value changed
    pub fn apply(document: &mut Document, update: &Document) -> bool {
        let Some(fields) = Self::set_fields(update) else {
            return false;
        };

        let mut modified = false;
        for (field, value) in fields {
            if is_id_field(field) {
                continue;
            }
            if document.get(field) != Some(value) {
                modified = true;
            }
            document.insert(field.clone(), value.clone());
        }
        modified
    }

    /// Builds the document inserted by an upsert: query equality fields
    /// overlaid with the update fields
    pub fn upsert_document(query: &Document, update: &Document) -> Document {
        let mut document: Document = query
            .iter()
            .filter(|(field, _)| !field.starts_with('$') && !is_id_field(field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();
        if let Some(fields) = Self::set_fields(update) {
            for (field, value) in fields {
                if is_id_field(field) {
                    continue;
                }
                document.insert(field.clone(), value.clone());
            }
        }
        document
    }
}
