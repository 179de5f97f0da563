//! Repolens - code and repository introspection core.
//!
//! Repolens is the shared analysis engine behind a set of uniform,
//! URI-addressed introspection adapters. The adapters themselves (URI
//! routing, CLI, rendering, resource access) live elsewhere; this crate
//! holds the parts with actual algorithms:
//!
//! - `analysis`: multi-language structural extraction over tree-sitter
//! - `score`: complexity/quality scoring and hotspot ranking
//! - `query`: the unified filter/sort/paginate engine
//! - `graph`: import graph, elementary cycles, unused imports, layers
//! - `blame`: semantic blame resolution over per-line authorship
//! - `scan`: parallel fan-out of extraction and scoring across files
//!
//! # Data flow
//!
//! ```text
//! source files -> analysis -> { score, graph, blame } -> query -> caller
//! ```
//!
//! Every component is a pure function over immutable inputs; per-file
//! failures surface as diagnostics next to partial results and never abort
//! a batch.
//!
//! # Adding a New Language
//!
//! See `src/analysis/languages/`. Implement the `LanguageBackend` trait
//! and register it in `languages/mod.rs`.

pub mod analysis;
pub mod blame;
pub mod config;
pub mod graph;
pub mod lines;
pub mod query;
pub mod scan;
pub mod score;

pub use analysis::{
    extract, register_backends, DiagnosticKind, ElementKind, Extraction, LanguageBackend,
    ParseDiagnostic, RawImport, StructuralElement,
};
pub use blame::{resolve as resolve_blame, AuthorShare, BlameAttribution, KeyHunk, LineAttribution};
pub use config::{LayerConfig, ScoreConfig};
pub use graph::{
    find_cycles, find_layer_violations, find_unused, Cycle, ImportEdge, ImportGraph,
    LayerViolation, UnusedImport,
};
pub use lines::{count_lines, LineCounts};
pub use query::{
    compare_values, evaluate, evaluate_query, CompareOptions, FieldValue, Filter, FilterOp,
    QueryError, Queryable, Record, RegexCache, ResultEnvelope, SortSpec,
};
pub use scan::{
    collect_source_files, scan_paths, scan_sources, CancelToken, FileReport, ScanInput, ScanReport,
};
pub use score::{hotspot_score, rank_hotspots, score as score_file, FileSummary, HotspotRecord};

/// Initialize all subsystems.
///
/// Call this once at startup. Safe to call again; backend registration is
/// idempotent.
pub fn init() {
    analysis::register_backends();
}
