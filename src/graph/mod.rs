//! Import graph, cycle detection, unused imports, and layer rules.

mod cycles;
mod layers;
mod unused;

pub use cycles::{find_cycles, Cycle};
pub use layers::{find_layer_violations, LayerViolation};
pub use unused::{find_unused, UnusedImport};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analysis::RawImport;

/// One resolved import edge, as supplied by the module resolver.
///
/// `target` is None for external/third-party modules; such edges stay out
/// of cycle detection but still participate in unused-import analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEdge {
    /// Importing file.
    pub source: String,
    /// Imported module identifier as written.
    pub module: String,
    /// Resolved target file, if the module is internal.
    pub target: Option<String>,
    /// Local names bound by the import.
    pub names: Vec<String>,
    pub line: usize,
    #[serde(default)]
    pub wildcard: bool,
    #[serde(default)]
    pub reexport: bool,
    #[serde(default)]
    pub typing_only: bool,
}

impl ImportEdge {
    /// Pair a raw extractor import with the resolver's verdict.
    pub fn from_raw(source: &str, raw: &RawImport, target: Option<String>) -> Self {
        Self {
            source: source.to_string(),
            module: raw.module.clone(),
            target,
            names: raw.names.clone(),
            line: raw.line,
            wildcard: raw.wildcard,
            reexport: raw.reexport,
            typing_only: raw.typing_only,
        }
    }
}

/// Directed import graph over files.
///
/// Nodes are interned into an arena of integer ids with adjacency lists, so
/// cyclic structures cannot leak through reference cycles and the graph
/// serializes as plain data.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportGraph {
    nodes: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    adjacency: Vec<Vec<usize>>,
}

impl ImportGraph {
    /// Build a graph from resolved edges.
    ///
    /// Unresolved and typing-only edges are skipped; they have no place in
    /// cycle detection.
    pub fn build(edges: &[ImportEdge]) -> Self {
        let mut graph = Self::default();

        for edge in edges {
            if edge.typing_only {
                continue;
            }
            let source = graph.intern(&edge.source);
            if let Some(target) = &edge.target {
                let target = graph.intern(target);
                if !graph.adjacency[source].contains(&target) {
                    graph.adjacency[source].push(target);
                }
            }
        }

        for neighbors in &mut graph.adjacency {
            neighbors.sort_unstable();
        }
        graph
    }

    fn intern(&mut self, file: &str) -> usize {
        if let Some(&id) = self.index.get(file) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(file.to_string());
        self.index.insert(file.to_string(), id);
        self.adjacency.push(Vec::new());
        id
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn file(&self, id: usize) -> &str {
        &self.nodes[id]
    }

    pub fn neighbors(&self, id: usize) -> &[usize] {
        &self.adjacency[id]
    }

    /// Node id for a file, if present.
    pub fn node_id(&self, file: &str) -> Option<usize> {
        self.index.get(file).copied()
    }
}
