//! Core trait for language backends.

use std::path::Path;

use super::Extraction;

/// Holds a parsed tree-sitter tree and associated metadata.
///
/// Kept separate from extraction output so the tree can be reused for
/// multiple passes without re-parsing.
pub struct ParsedSource {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path (for record and diagnostic attribution).
    pub path: String,
}

impl ParsedSource {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }
}

/// Language-specific backend trait.
///
/// Each language implements this to provide parsing and structural
/// extraction. Backends are resolved once through the registry in
/// `languages::get_backend` and never replaced at runtime.
///
/// # Thread Safety
///
/// tree_sitter::Parser is not Sync, so implementations create a parser per
/// call rather than holding one.
pub trait LanguageBackend: Send + Sync {
    /// Language tag this backend answers to (e.g. "python", "rust").
    fn language_id(&self) -> &'static str;

    /// File extensions handled (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Line comment prefix, for line classification.
    fn line_comment(&self) -> &'static str;

    /// Block comment delimiters, if the language has them.
    fn block_comment(&self) -> Option<(&'static str, &'static str)> {
        None
    }

    /// Parse a source file into a tree-sitter tree.
    ///
    /// Returns an error only if the parser itself fails; partial syntax
    /// errors still yield a tree with ERROR nodes.
    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedSource>;

    /// Extract elements, imports, and referenced symbols from a parsed file.
    fn extract(&self, parsed: &ParsedSource) -> anyhow::Result<Extraction>;

    /// Check if this backend handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
