//! Elementary cycle detection over the import graph.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::ImportGraph;

/// An elementary cycle, reported in minimal rotation (the first file the
/// graph interned comes first). The same node set in another rotation is
/// the same cycle and is never reported twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub files: Vec<String>,
}

impl Cycle {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Find elementary cycles by depth-first traversal.
///
/// Every unvisited node starts a DFS carrying an explicit recursion stack;
/// revisiting a node already on the stack emits the stack slice from its
/// first occurrence as a cycle, and the search keeps going so all cycles
/// reachable from a start node are found, not just the first. Duplicate
/// rotations are collapsed by canonicalizing each cycle.
pub fn find_cycles(graph: &ImportGraph) -> Vec<Cycle> {
    let n = graph.node_count();
    let mut visited = vec![false; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    let mut cycles: Vec<Vec<usize>> = Vec::new();

    for start in 0..n {
        if !visited[start] {
            dfs(
                graph,
                start,
                &mut visited,
                &mut on_stack,
                &mut stack,
                &mut seen,
                &mut cycles,
            );
        }
    }

    let mut out: Vec<Cycle> = cycles
        .into_iter()
        .map(|ids| Cycle {
            files: ids.iter().map(|&id| graph.file(id).to_string()).collect(),
        })
        .collect();
    out.sort_by(|a, b| (a.files.len(), &a.files).cmp(&(b.files.len(), &b.files)));
    out
}

fn dfs(
    graph: &ImportGraph,
    node: usize,
    visited: &mut [bool],
    on_stack: &mut [bool],
    stack: &mut Vec<usize>,
    seen: &mut HashSet<Vec<usize>>,
    cycles: &mut Vec<Vec<usize>>,
) {
    visited[node] = true;
    on_stack[node] = true;
    stack.push(node);

    for &next in graph.neighbors(node) {
        if on_stack[next] {
            // Back edge: the slice from the first stack occurrence of
            // `next` to the current node is an elementary cycle.
            let Some(pos) = stack.iter().position(|&id| id == next) else {
                continue;
            };
            let cycle = canonical_rotation(&stack[pos..]);
            if seen.insert(cycle.clone()) {
                cycles.push(cycle);
            }
        } else if !visited[next] {
            dfs(graph, next, visited, on_stack, stack, seen, cycles);
        }
    }

    stack.pop();
    on_stack[node] = false;
}

/// Rotate a cycle so its smallest node id comes first.
fn canonical_rotation(ids: &[usize]) -> Vec<usize> {
    if ids.is_empty() {
        return Vec::new();
    }
    let min_pos = ids
        .iter()
        .enumerate()
        .min_by_key(|&(_, &id)| id)
        .map(|(pos, _)| pos)
        .unwrap_or(0);
    let mut rotated = Vec::with_capacity(ids.len());
    rotated.extend_from_slice(&ids[min_pos..]);
    rotated.extend_from_slice(&ids[..min_pos]);
    rotated
}
