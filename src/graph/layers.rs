//! Architectural layer-violation checks.

use serde::{Deserialize, Serialize};

use super::ImportEdge;
use crate::config::LayerConfig;

/// An import edge crossing a forbidden layer boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerViolation {
    pub source: String,
    pub target: String,
    pub from_layer: String,
    pub to_layer: String,
    pub module: String,
    pub line: usize,
}

/// Check resolved edges against the layer rules.
///
/// Inert when the config carries no allow table: without one, nothing is
/// ever reported. An empty per-layer allow-list is the opposite - that
/// layer may import from nowhere.
pub fn find_layer_violations(edges: &[ImportEdge], config: &LayerConfig) -> Vec<LayerViolation> {
    let Some(allow) = &config.allow else {
        return Vec::new();
    };

    let mut violations: Vec<LayerViolation> = Vec::new();

    for edge in edges {
        if edge.typing_only {
            continue;
        }
        let Some(target) = &edge.target else {
            continue;
        };
        let Some(from_layer) = config.layer_of(&edge.source) else {
            continue;
        };
        let Some(to_layer) = config.layer_of(target) else {
            continue;
        };
        if from_layer == to_layer {
            continue;
        }
        let allowed = allow
            .get(from_layer)
            .map(|targets| targets.iter().any(|t| t == to_layer))
            .unwrap_or(false);
        if !allowed {
            violations.push(LayerViolation {
                source: edge.source.clone(),
                target: target.clone(),
                from_layer: from_layer.to_string(),
                to_layer: to_layer.to_string(),
                module: edge.module.clone(),
                line: edge.line,
            });
        }
    }

    violations.sort_by(|a, b| (&a.source, a.line).cmp(&(&b.source, b.line)));
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerRule;
    use std::collections::BTreeMap;

    fn edge(source: &str, target: &str) -> ImportEdge {
        ImportEdge {
            source: source.to_string(),
            module: target.to_string(),
            target: Some(target.to_string()),
            names: Vec::new(),
            line: 1,
            wildcard: false,
            reexport: false,
            typing_only: false,
        }
    }

    fn config(allow: Option<BTreeMap<String, Vec<String>>>) -> LayerConfig {
        LayerConfig {
            layers: vec![
                LayerRule {
                    name: "core".to_string(),
                    prefixes: vec!["core/".to_string()],
                },
                LayerRule {
                    name: "adapters".to_string(),
                    prefixes: vec!["adapters/".to_string()],
                },
            ],
            allow,
        }
    }

    #[test]
    fn test_no_allow_table_means_inert() {
        let edges = vec![edge("core/engine.py", "adapters/tls.py")];
        assert!(find_layer_violations(&edges, &config(None)).is_empty());
    }

    #[test]
    fn test_violation_and_allowed_edge() {
        let mut allow = BTreeMap::new();
        allow.insert("adapters".to_string(), vec!["core".to_string()]);
        let config = config(Some(allow));

        // adapters -> core is allowed, core -> adapters is not.
        let ok = edge("adapters/tls.py", "core/engine.py");
        let bad = edge("core/engine.py", "adapters/tls.py");

        let violations = find_layer_violations(&[ok, bad], &config);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].from_layer, "core");
        assert_eq!(violations[0].to_layer, "adapters");
    }

    #[test]
    fn test_empty_allow_list_permits_nothing() {
        let mut allow = BTreeMap::new();
        allow.insert("core".to_string(), Vec::new());
        let config = config(Some(allow));

        let violations =
            find_layer_violations(&[edge("core/engine.py", "adapters/tls.py")], &config);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_same_layer_is_never_a_violation() {
        let config = config(Some(BTreeMap::new()));
        let violations =
            find_layer_violations(&[edge("core/a.py", "core/b.py")], &config);
        assert!(violations.is_empty());
    }

    #[test]
    fn test_unmapped_files_are_skipped() {
        let config = config(Some(BTreeMap::new()));
        let violations =
            find_layer_violations(&[edge("scripts/tool.py", "core/a.py")], &config);
        assert!(violations.is_empty());
    }
}
