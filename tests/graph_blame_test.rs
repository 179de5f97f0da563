//! Integration tests: extraction feeding the import graph and blame.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use repolens::analysis::extract;
use repolens::blame::{resolve, LineAttribution};
use repolens::graph::{find_cycles, find_unused, ImportEdge, ImportGraph};

/// Toy resolver: maps a module id to "<module>.py" when it names one of
/// the scanned files.
fn resolve_edges(
    files: &[(&str, &str)],
) -> (Vec<ImportEdge>, HashMap<String, std::collections::BTreeSet<String>>) {
    repolens::init();

    let known: Vec<String> = files
        .iter()
        .map(|(path, _)| path.trim_end_matches(".py").to_string())
        .collect();

    let mut edges = Vec::new();
    let mut references = HashMap::new();
    for (path, source) in files {
        let out = extract(path, source.as_bytes(), "python");
        assert!(out.diagnostics.is_empty(), "fixture must parse: {}", path);
        for raw in &out.imports {
            let target = known
                .iter()
                .find(|k| k.as_str() == raw.module)
                .map(|k| format!("{}.py", k));
            edges.push(ImportEdge::from_raw(path, raw, target));
        }
        references.insert(path.to_string(), out.references);
    }
    (edges, references)
}

#[test]
fn test_import_cycle_detected_from_real_sources() {
    let files = [
        ("alpha.py", "import beta\n\nx = beta.value\n"),
        ("beta.py", "import gamma\n\nvalue = gamma.seed\n"),
        ("gamma.py", "import alpha\n\nseed = 1\n"),
        ("leaf.py", "import alpha\n\ny = alpha.x\n"),
    ];
    let (edges, _) = resolve_edges(&files);
    let graph = ImportGraph::build(&edges);

    let cycles = find_cycles(&graph);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].files.len(), 3);
    assert!(cycles[0].files.contains(&"alpha.py".to_string()));
}

#[test]
fn test_dag_has_no_cycles() {
    let files = [
        ("alpha.py", "import beta\n\nx = beta.value\n"),
        ("beta.py", "value = 2\n"),
    ];
    let (edges, _) = resolve_edges(&files);
    assert!(find_cycles(&ImportGraph::build(&edges)).is_empty());
}

#[test]
fn test_unused_import_and_typing_only_exclusion() {
    let files = [(
        "app.py",
        r#"
import os
import sys
from typing import TYPE_CHECKING

if TYPE_CHECKING:
    from models import Foo


def main():
    print(sys.argv)
"#,
    )];
    let (edges, references) = resolve_edges(&files);

    let unused = find_unused(&edges, &references);
    let modules: Vec<&str> = unused.iter().map(|u| u.module.as_str()).collect();

    // `os` has no references; `sys` does; the typing-only `Foo` import is
    // never flagged even though nothing references it.
    assert_eq!(modules, vec!["os"]);
}

#[test]
fn test_typing_only_edges_never_enter_cycle_detection() {
    let files = [
        (
            "alpha.py",
            "from typing import TYPE_CHECKING\n\nif TYPE_CHECKING:\n    import beta\n",
        ),
        ("beta.py", "import alpha\n\nx = 1\n"),
    ];
    let (edges, _) = resolve_edges(&files);
    let graph = ImportGraph::build(&edges);
    assert!(find_cycles(&graph).is_empty());
}

#[test]
fn test_semantic_blame_over_extracted_elements() {
    repolens::init();

    let source = "\
class Ledger:
    def post(self, entry):
        if entry.valid:
            self.entries.append(entry)
            return True
        return False

def summary():
    return None
";
    let extraction = extract("ledger.py", source.as_bytes(), "python");

    let t = |secs| Utc.timestamp_opt(secs, 0).single().unwrap();
    let attribution: Vec<LineAttribution> = (1..=9)
        .map(|line| LineAttribution {
            line,
            commit: if line <= 6 { "c-ana" } else { "c-bo" }.to_string(),
            author: if line <= 6 { "ana" } else { "bo" }.to_string(),
            email: if line <= 6 {
                "ana@example.com"
            } else {
                "bo@example.com"
            }
            .to_string(),
            timestamp: t(if line <= 6 { 100 } else { 200 }),
        })
        .collect();

    // Dotted method target resolves to the method's span only.
    let blame = resolve("ledger.py", &attribution, &extraction.elements, Some("Ledger.post"));
    assert!(!blame.fallback);
    assert_eq!(blame.element.as_deref(), Some("Ledger.post"));
    assert_eq!(blame.shares.len(), 1);
    assert_eq!(blame.shares[0].author, "ana");
    assert!((blame.shares[0].percentage - 100.0).abs() < 1e-9);

    // Percentages over the whole file sum to 100.
    let whole = resolve("ledger.py", &attribution, &extraction.elements, None);
    let total: f64 = whole.shares.iter().map(|s| s.percentage).sum();
    assert!((total - 100.0).abs() < 1e-9);
    assert_eq!(whole.primary.as_ref().unwrap().author, "ana");
    assert_eq!(whole.hunks.len(), 2);

    // A missing element name is a flagged fallback, not an error.
    let fallback = resolve(
        "ledger.py",
        &attribution,
        &extraction.elements,
        Some("Ledger.missing"),
    );
    assert!(fallback.fallback);
    assert!(fallback.element.is_none());
}
