//! In-memory query execution
//!
//! The pieces the emulated store runs over a loaded collection:
//!
//! - [`PredicateFilter`]: query specification matching
//! - [`UpdateApplier`]: `$set` / flat field merges and upsert documents
//! - [`PipelineEvaluator`]: `$match` + null-key `$group` with `$sum`
//!
//! All of them are pure functions over [`crate::document::Document`].

mod aggregate;
mod filters;
mod update;

pub use aggregate::PipelineEvaluator;
pub use filters::{PredicateFilter, OR_KEY};
pub use update::{UpdateApplier, SET_KEY};
