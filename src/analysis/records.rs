//! Normalized records produced by the structural extractor.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of structural element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Function,
    Method,
    Class,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Function => "function",
            ElementKind::Method => "method",
            ElementKind::Class => "class",
        }
    }

    /// Check if this is a callable (function or method).
    pub fn is_callable(&self) -> bool {
        matches!(self, ElementKind::Function | ElementKind::Method)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One function, method, or class definition with computed metrics.
///
/// Produced by the extractor per parse, immutable afterwards. The name is
/// qualified for methods ("Type.method") and unique within file + kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralElement {
    pub name: String,
    pub kind: ElementKind,
    pub file: String,
    /// Start line (1-indexed).
    pub start_line: usize,
    pub line_count: usize,
    /// Cyclomatic complexity: 1 + decision points in the element's own
    /// subtree. Nested elements keep their own branches.
    pub complexity: u32,
    /// Maximum depth of nested control-flow blocks within the element.
    pub nesting_depth: u32,
    /// Decorator/annotation names, in source order. Empty for languages
    /// without the concept.
    pub decorators: Vec<String>,
}

impl StructuralElement {
    /// Last line covered by this element (inclusive).
    pub fn end_line(&self) -> usize {
        self.start_line + self.line_count.saturating_sub(1)
    }

    /// Check whether a 1-indexed line falls inside this element's span.
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line < self.start_line + self.line_count
    }
}

/// Why a file produced no (or partial) structural output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The file could not be parsed; it is skipped, the scan continues.
    ParseError,
    /// No backend is registered for the language tag. Informational.
    UnsupportedLanguage,
}

/// A per-file diagnostic attached to extraction output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseDiagnostic {
    pub file: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl ParseDiagnostic {
    pub fn parse_error(file: &str, message: impl Into<String>) -> Self {
        Self {
            file: file.to_string(),
            kind: DiagnosticKind::ParseError,
            message: message.into(),
        }
    }

    pub fn unsupported(file: &str, tag: &str) -> Self {
        Self {
            file: file.to_string(),
            kind: DiagnosticKind::UnsupportedLanguage,
            message: format!("unsupported language {:?}", tag),
        }
    }
}

/// A raw import statement as seen in source, before module resolution.
///
/// The module identifier is the literal import path; resolution to a target
/// file is the resolver collaborator's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawImport {
    pub module: String,
    /// Local names bound by this import. Empty for side-effect imports.
    pub names: Vec<String>,
    /// Line of the import statement (1-indexed).
    pub line: usize,
    /// `from x import *` / dot-imports. Always treated as used downstream.
    #[serde(default)]
    pub wildcard: bool,
    /// Re-export forms (`pub use`, `export ... from`).
    #[serde(default)]
    pub reexport: bool,
    /// Typing-only imports (Python `if TYPE_CHECKING:` blocks, TS
    /// `import type`). Excluded from unused- and cycle-analysis.
    #[serde(default)]
    pub typing_only: bool,
}

/// Everything the extractor learned about one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extraction {
    pub elements: Vec<StructuralElement>,
    /// Identifiers referenced in the file outside import statements.
    /// Feeds unused-import analysis.
    pub references: BTreeSet<String>,
    pub imports: Vec<RawImport>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl Extraction {
    /// Empty output carrying a single diagnostic.
    pub fn with_diagnostic(diagnostic: ParseDiagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
            ..Default::default()
        }
    }

    /// Find an element by (qualified) name.
    pub fn find_element(&self, name: &str) -> Option<&StructuralElement> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// All functions and methods.
    pub fn callables(&self) -> impl Iterator<Item = &StructuralElement> {
        self.elements.iter().filter(|e| e.kind.is_callable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(name: &str, start: usize, count: usize) -> StructuralElement {
        StructuralElement {
            name: name.to_string(),
            kind: ElementKind::Function,
            file: "a.py".to_string(),
            start_line: start,
            line_count: count,
            complexity: 1,
            nesting_depth: 0,
            decorators: Vec::new(),
        }
    }

    #[test]
    fn test_element_span() {
        let e = element("f", 10, 5);
        assert_eq!(e.end_line(), 14);
        assert!(e.contains_line(10));
        assert!(e.contains_line(14));
        assert!(!e.contains_line(15));
        assert!(!e.contains_line(9));
    }

    #[test]
    fn test_with_diagnostic() {
        let ex = Extraction::with_diagnostic(ParseDiagnostic::unsupported("x.zig", "zig"));
        assert!(ex.elements.is_empty());
        assert_eq!(ex.diagnostics.len(), 1);
        assert_eq!(ex.diagnostics[0].kind, DiagnosticKind::UnsupportedLanguage);
    }
}
