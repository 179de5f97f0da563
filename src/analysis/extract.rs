//! Top-level extraction entry point.

use std::path::Path;

use tracing::debug;

use super::languages::get_backend;
use super::{Extraction, ParseDiagnostic};

/// Extract structural elements from one file.
///
/// Never fails: an unknown language tag yields an informational diagnostic,
/// and a file that does not parse yields a `ParseError` diagnostic with an
/// empty element list. Either way the caller's batch continues.
pub fn extract(file_path: &str, source: &[u8], language_tag: &str) -> Extraction {
    let Some(backend) = get_backend(language_tag) else {
        debug!(file = file_path, tag = language_tag, "no backend for language");
        return Extraction::with_diagnostic(ParseDiagnostic::unsupported(file_path, language_tag));
    };

    let parsed = match backend.parse(Path::new(file_path), source) {
        Ok(p) => p,
        Err(e) => {
            return Extraction::with_diagnostic(ParseDiagnostic::parse_error(
                file_path,
                e.to_string(),
            ));
        }
    };

    if parsed.tree.root_node().has_error() {
        return Extraction::with_diagnostic(ParseDiagnostic::parse_error(
            file_path,
            format!("syntax error in {}", file_path),
        ));
    }

    match backend.extract(&parsed) {
        Ok(extraction) => extraction,
        Err(e) => {
            Extraction::with_diagnostic(ParseDiagnostic::parse_error(file_path, e.to_string()))
        }
    }
}
