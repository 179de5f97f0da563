//! Shared tree walkers for metric computation.
//!
//! Complexity and nesting are computed by walking an element's subtree and
//! stopping at nested element definitions, so a nested function's branches
//! count toward the nested function rather than its encloser. Backends
//! supply the node-kind predicates; the traversal is language-agnostic.

use std::collections::BTreeSet;

use tree_sitter::Node;

/// Predicate over a tree-sitter node.
pub type NodePredicate<'a> = &'a dyn Fn(Node) -> bool;

/// Count decision-point nodes below `root`, skipping subtrees that are
/// themselves element definitions. `root` itself is never skipped or
/// counted.
pub fn count_decision_points(
    root: Node,
    is_decision: NodePredicate,
    is_element_boundary: NodePredicate,
) -> u32 {
    let mut count = 0;
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if is_element_boundary(child) {
            continue;
        }
        if is_decision(child) {
            count += 1;
        }
        count += count_decision_points(child, is_decision, is_element_boundary);
    }
    count
}

/// Maximum depth of nested control-flow blocks below `root`, with the same
/// element-boundary skipping as `count_decision_points`.
pub fn max_block_nesting(
    root: Node,
    is_block: NodePredicate,
    is_element_boundary: NodePredicate,
) -> u32 {
    let mut max = 0;
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if is_element_boundary(child) {
            continue;
        }
        let depth = if is_block(child) {
            1 + max_block_nesting(child, is_block, is_element_boundary)
        } else {
            max_block_nesting(child, is_block, is_element_boundary)
        };
        if depth > max {
            max = depth;
        }
    }
    max
}

/// Collect identifier texts below `root`, skipping any node whose byte
/// range falls inside one of `skip_ranges` (import statements).
pub fn collect_identifiers(
    root: Node,
    source: &[u8],
    ident_kinds: &phf::Set<&'static str>,
    skip_ranges: &[(usize, usize)],
) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_identifiers_into(root, source, ident_kinds, skip_ranges, &mut out);
    out
}

fn collect_identifiers_into(
    node: Node,
    source: &[u8],
    ident_kinds: &phf::Set<&'static str>,
    skip_ranges: &[(usize, usize)],
    out: &mut BTreeSet<String>,
) {
    let start = node.start_byte();
    if skip_ranges
        .iter()
        .any(|&(lo, hi)| start >= lo && start < hi)
    {
        return;
    }
    if ident_kinds.contains(node.kind()) {
        if let Ok(text) = node.utf8_text(source) {
            out.insert(text.to_string());
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_identifiers_into(child, source, ident_kinds, skip_ranges, out);
    }
}

/// Whether `node` is a binary expression whose operator field is one of the
/// short-circuit operators in `ops` (e.g. "&&", "||", "??").
pub fn is_short_circuit(node: Node, ops: &[&str]) -> bool {
    if node.kind() != "binary_expression" {
        return false;
    }
    node.child_by_field_name("operator")
        .map(|op| ops.contains(&op.kind()))
        .unwrap_or(false)
}

/// Walk `node`'s ancestors and return the first whose kind matches,
/// stopping early when a kind in `stop` is hit first.
pub fn nearest_ancestor<'a>(
    node: Node<'a>,
    kinds: &[&str],
    stop: &[&str],
) -> Option<Node<'a>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if kinds.contains(&n.kind()) {
            return Some(n);
        }
        if stop.contains(&n.kind()) {
            return None;
        }
        current = n.parent();
    }
    None
}
