//! Unused-import detection.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::ImportEdge;

/// An import binding none of whose names are referenced in its file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnusedImport {
    pub file: String,
    pub module: String,
    pub names: Vec<String>,
    pub line: usize,
}

/// Flag import bindings whose bound names never appear among the file's
/// referenced symbols.
///
/// Wildcard imports and re-export lists are always treated as used - a
/// deliberate false negative, since their bindings cannot be enumerated
/// reliably. Typing-only imports and bindings with no names (side-effect
/// imports) are never flagged. Unresolved modules are still checked: not
/// knowing the target file says nothing about whether the binding is used.
pub fn find_unused(
    edges: &[ImportEdge],
    references: &HashMap<String, BTreeSet<String>>,
) -> Vec<UnusedImport> {
    let mut unused: Vec<UnusedImport> = Vec::new();

    for edge in edges {
        if edge.wildcard || edge.reexport || edge.typing_only || edge.names.is_empty() {
            continue;
        }
        let referenced = references.get(&edge.source);
        let any_used = edge.names.iter().any(|name| {
            referenced
                .map(|refs| refs.contains(name))
                .unwrap_or(false)
        });
        if !any_used {
            unused.push(UnusedImport {
                file: edge.source.clone(),
                module: edge.module.clone(),
                names: edge.names.clone(),
                line: edge.line,
            });
        }
    }

    unused.sort_by(|a, b| (&a.file, a.line, &a.module).cmp(&(&b.file, b.line, &b.module)));
    unused
}
