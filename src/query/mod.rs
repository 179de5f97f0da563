//! Unified query engine.
//!
//! One predicate/sort/limit/offset evaluator shared by every adapter that
//! exposes queryable records: structural elements, file summaries, commit
//! rows, arbitrary key/value records. Comparison semantics that differ
//! between consuming domains (case folding, list matching, `!=` against
//! null) are per-call-site `CompareOptions`, not crate policy.

mod engine;
mod filter;
mod value;

pub use engine::{evaluate, evaluate_query, ResultEnvelope, SortSpec};
pub use filter::{compare_values, CompareOptions, Filter, FilterOp, RegexCache};
pub use value::{FieldValue, Queryable, Record};

use thiserror::Error;

/// Errors raised while building a query.
///
/// A malformed term is fatal to its query only and is raised before any
/// filter is applied; evaluation itself never fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid filter syntax: {0:?}")]
    InvalidFilter(String),
    #[error("invalid sort spec: {0:?}")]
    InvalidSort(String),
}
