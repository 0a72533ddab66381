//! Aggregation pipeline evaluation
//!
//! Two stage kinds are understood:
//! - `$match`: filters the working set with [`PredicateFilter`]
//! - `$group` with a null `_id`: folds the working set into one record of
//!   `$sum` accumulators and ends the pipeline
//!
//! Grouping by key, `$sort`, `$project` and other accumulators are not
//! supported. Such stages are skipped and the working set passes through.

use serde_json::{Number, Value};
use tracing::warn;

use crate::document::Document;

use super::filters::PredicateFilter;

const MATCH_STAGE: &str = "$match";
const GROUP_STAGE: &str = "$group";
const GROUP_ID: &str = "_id";
const SUM_ACCUMULATOR: &str = "$sum";

/// A pipeline stage as understood by the evaluator
#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage<'a> {
    Match(&'a Document),
    Group(&'a Document),
    Unsupported(&'a str),
}

impl<'a> Stage<'a> {
    fn parse(stage: &'a Document) -> Self {
        if let Some(value) = stage.get(MATCH_STAGE) {
            return match value {
                Value::Object(conditions) => Stage::Match(conditions),
                _ => Stage::Unsupported(MATCH_STAGE),
            };
        }
        if let Some(value) = stage.get(GROUP_STAGE) {
            return match value {
                Value::Object(spec) => Stage::Group(spec),
                _ => Stage::Unsupported(GROUP_STAGE),
            };
        }
        Stage::Unsupported(stage.keys().next().map(String::as_str).unwrap_or(""))
    }
}

/// Runs a restricted aggregation pipeline over an in-memory document set
pub struct PipelineEvaluator;

impl PipelineEvaluator {
    /// Evaluates `pipeline` against `documents`
    pub fn evaluate(documents: Vec<Document>, pipeline: &[Document]) -> Vec<Document> {
        let mut working = documents;

        for stage in pipeline {
            match Stage::parse(stage) {
                Stage::Match(conditions) => {
                    working.retain(|doc| PredicateFilter::matches(doc, conditions));
                }
                Stage::Group(spec) if Self::is_null_group(spec) => {
                    return vec![Self::fold_sums(&working, spec)];
                }
                Stage::Group(spec) => {
                    let group_id = spec.get(GROUP_ID).cloned().unwrap_or_default();
                    warn!(
                        group_id = %group_id,
                        "grouping by key is not supported, stage skipped"
                    );
                }
                Stage::Unsupported(kind) => {
                    warn!(stage = kind, "unsupported aggregation stage skipped");
                }
            }
        }

        working
    }

    fn is_null_group(spec: &Document) -> bool {
        spec.get(GROUP_ID).map_or(true, Value::is_null)
    }

    /// Builds `{"_id": null, <name>: <sum>, ...}` for each `$sum` accumulator
    fn fold_sums(documents: &[Document], spec: &Document) -> Document {
        let mut record = Document::new();
        record.insert(GROUP_ID.to_string(), Value::Null);

        for (name, accumulator) in spec {
            if name == GROUP_ID {
                continue;
            }
            let Some(field) = Self::sum_source(accumulator) else {
                continue;
            };
            let total = documents
                .iter()
                .fold(Sum::default(), |acc, doc| acc.add(doc.get(field)));
            record.insert(name.clone(), total.into_value());
        }

        record
    }

    /// `{"$sum": "$field"}` -> `field`
    fn sum_source(accumulator: &Value) -> Option<&str> {
        let source = accumulator.as_object()?.get(SUM_ACCUMULATOR)?.as_str()?;
        Some(source.trim_start_matches('$'))
    }
}

/// Running sum that stays integral until a float shows up
#[derive(Debug, Clone, Copy)]
enum Sum {
    Int(i64),
    Float(f64),
}

impl Default for Sum {
    fn default() -> Self {
        Sum::Int(0)
    }
}

impl Sum {
    fn add(self, value: Option<&Value>) -> Self {
        let Some(Value::Number(n)) = value else {
            return self;
        };
        match (self, n.as_i64()) {
            (Sum::Int(acc), Some(i)) => match acc.checked_add(i) {
                Some(total) => Sum::Int(total),
                None => Sum::Float(acc as f64 + i as f64),
            },
            (Sum::Int(acc), None) => Sum::Float(acc as f64 + n.as_f64().unwrap_or(0.0)),
            (Sum::Float(acc), _) => Sum::Float(acc + n.as_f64().unwrap_or(0.0)),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Sum::Int(total) => Value::from(total),
            Sum::Float(total) => Number::from_f64(total).map_or(Value::Null, Value::Number),
        }
    }
}
