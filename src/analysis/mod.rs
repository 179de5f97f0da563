//! Structural extraction over tree-sitter.
//!
//! This module turns source text into normalized structural records:
//! - Elements (functions, methods, classes) with size, complexity, nesting,
//!   and decorator metrics
//! - Raw imports with bound local names
//! - Referenced symbols, feeding unused-import analysis
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌──────────────────┐
//! │ Source text  │────▶│ Backends      │────▶│ Extraction       │
//! └──────────────┘     │ (py, rs, go,  │     │ (elements,       │
//!                      │  ts, js)      │     │  imports, refs)  │
//!                      └───────────────┘     └──────────────────┘
//! ```
//!
//! # Adding a New Language
//!
//! 1. Create a module in `src/analysis/languages/`
//! 2. Implement the `LanguageBackend` trait
//! 3. Define tree-sitter queries and node-kind sets
//! 4. Register the backend in `languages/mod.rs`

mod extract;
mod records;
mod traits;
pub(crate) mod walk;

pub mod languages;

pub use extract::extract;
pub use languages::{get_backend, register_backends, tag_for_extension};
pub use records::{
    DiagnosticKind, ElementKind, Extraction, ParseDiagnostic, RawImport, StructuralElement,
};
pub use traits::{LanguageBackend, ParsedSource};
