//! Predicate filtering for queries
//!
//! Filters documents strictly by equality, plus a flat `$or`.
//! No type coercion, no range operators, no dot paths. Any other operator
//! is compared as a literal value and so never matches real data.

use serde_json::Value;

use crate::document::{Document, ID_FIELD, NATIVE_ID_FIELD};

/// Reserved query key for a logical OR of flat equality sets
pub const OR_KEY: &str = "$or";

/// Evaluates query specifications against documents
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if a document matches every top-level condition (AND semantics)
    ///
    /// An empty query matches everything.
    pub fn matches(document: &Document, query: &Document) -> bool {
        query.iter().all(|(field, expected)| {
            if field == OR_KEY {
                Self::matches_any(document, expected)
            } else {
                Self::eq_match(document, field, expected)
            }
        })
    }

    /// Checks a flat equality set; `$or` is not interpreted here
    pub fn matches_flat(document: &Document, conditions: &Document) -> bool {
        conditions
            .iter()
            .all(|(field, expected)| Self::eq_match(document, field, expected))
    }

    /// Matches when `query` is absent or the document satisfies it
    pub fn matches_optional(document: &Document, query: Option<&Document>) -> bool {
        query.map_or(true, |q| Self::matches(document, q))
    }

    /// `$or`: at least one branch must match as a flat equality set
    fn matches_any(document: &Document, branches: &Value) -> bool {
        let Some(branches) = branches.as_array() else {
            return false;
        };
        branches.iter().any(|branch| match branch {
            Value::Object(conditions) => Self::matches_flat(document, conditions),
            _ => false,
        })
    }

    /// Exact equality; a missing field compares as null
    ///
    /// `_id` is looked up as `id`.
    fn eq_match(document: &Document, field: &str, expected: &Value) -> bool {
        let field = if field == NATIVE_ID_FIELD { ID_FIELD } else { field };
        document.get(field).unwrap_or(&Value::Null) == expected
    }
}
