//! Rust language backend using tree-sitter.
//!
//! Extracts function items, impl/trait methods, type definitions, use
//! declarations, and the control-flow facts behind complexity and nesting.

use std::path::Path;

use phf::phf_set;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::analysis::walk::{
    collect_identifiers, count_decision_points, is_short_circuit, max_block_nesting,
    nearest_ancestor,
};
use crate::analysis::{
    ElementKind, Extraction, LanguageBackend, ParsedSource, RawImport, StructuralElement,
};

const DECLARATION_QUERY: &str = r#"
; Functions and methods
(function_item
  name: (identifier) @name
) @function

; Struct declarations
(struct_item
  name: (type_identifier) @name
) @type_def

; Enum declarations
(enum_item
  name: (type_identifier) @name
) @type_def

; Trait declarations
(trait_item
  name: (type_identifier) @name
) @type_def
"#;

static DECISION_KINDS: phf::Set<&'static str> = phf_set! {
    "if_expression",
    "for_expression",
    "while_expression",
    "loop_expression",
    "match_arm",
    "try_expression",
};

static NESTING_KINDS: phf::Set<&'static str> = phf_set! {
    "if_expression",
    "for_expression",
    "while_expression",
    "loop_expression",
    "match_expression",
};

static ELEMENT_BOUNDARY_KINDS: phf::Set<&'static str> = phf_set! {
    "function_item",
    "struct_item",
    "enum_item",
    "trait_item",
    "impl_item",
    "mod_item",
};

static IDENT_KINDS: phf::Set<&'static str> = phf_set! {
    "identifier",
    "type_identifier",
    "field_identifier",
};

pub struct RustBackend {
    language: Language,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_rust::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    fn extract_elements(&self, parsed: &ParsedSource) -> anyhow::Result<Vec<StructuralElement>> {
        let query = Query::new(&self.language, DECLARATION_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let mut elements = Vec::new();
        let mut seen = std::collections::HashSet::new();

        while let Some(m) = matches.next() {
            let mut name = String::new();
            let mut node = None;
            let mut is_type = false;

            for capture in m.captures {
                match query.capture_names()[capture.index as usize] {
                    "name" => name = parsed.node_text(capture.node).to_string(),
                    "function" => node = Some(capture.node),
                    "type_def" => {
                        node = Some(capture.node);
                        is_type = true;
                    }
                    _ => {}
                }
            }

            let Some(node) = node else { continue };
            if name.is_empty() || !seen.insert((node.start_byte(), name.clone())) {
                continue;
            }

            let kind = if is_type {
                ElementKind::Class
            } else if let Some(owner) = impl_or_trait_owner(node, parsed) {
                name = format!("{}.{}", owner, name);
                ElementKind::Method
            } else {
                ElementKind::Function
            };

            let start_line = node.start_position().row + 1;
            let line_count = node.end_position().row - node.start_position().row + 1;

            elements.push(StructuralElement {
                name,
                kind,
                file: parsed.path.clone(),
                start_line,
                line_count,
                complexity: 1 + count_decision_points(node, &is_decision, &is_boundary),
                nesting_depth: max_block_nesting(node, &is_nesting, &is_boundary),
                decorators: attribute_names(node, parsed),
            });
        }

        elements.sort_by_key(|e| (e.start_line, e.name.clone()));
        Ok(elements)
    }

    fn extract_imports(&self, parsed: &ParsedSource) -> Vec<RawImport> {
        let mut imports = Vec::new();
        collect_use_declarations(parsed.tree.root_node(), parsed, &mut imports);
        imports
    }
}

fn is_decision(node: Node) -> bool {
    DECISION_KINDS.contains(node.kind()) || is_short_circuit(node, &["&&", "||"])
}

fn is_nesting(node: Node) -> bool {
    NESTING_KINDS.contains(node.kind())
}

fn is_boundary(node: Node) -> bool {
    ELEMENT_BOUNDARY_KINDS.contains(node.kind())
}

/// The impl or trait type owning a function item, stripped of generics.
fn impl_or_trait_owner(node: Node, parsed: &ParsedSource) -> Option<String> {
    let owner = nearest_ancestor(node, &["impl_item", "trait_item"], &["function_item"])?;
    let name_node = match owner.kind() {
        "impl_item" => owner.child_by_field_name("type")?,
        _ => owner.child_by_field_name("name")?,
    };
    let text = parsed.node_text(name_node);
    Some(text.split('<').next().unwrap_or(text).trim().to_string())
}

/// Outer attribute names: preceding `#[...]` siblings of an item.
fn attribute_names(node: Node, parsed: &ParsedSource) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = node.prev_sibling();
    while let Some(sib) = current {
        if sib.kind() != "attribute_item" {
            break;
        }
        let text = parsed.node_text(sib);
        let name = text
            .trim_start_matches("#[")
            .trim_end_matches(']')
            .split('(')
            .next()
            .unwrap_or("")
            .trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
        current = sib.prev_sibling();
    }
    // Siblings were walked bottom-up.
    names.reverse();
    names.dedup();
    names
}

fn collect_use_declarations(node: Node, parsed: &ParsedSource, out: &mut Vec<RawImport>) {
    if node.kind() == "use_declaration" {
        let line = node.start_position().row + 1;
        let reexport = {
            let mut cursor = node.walk();
            let has_vis = node
                .children(&mut cursor)
                .any(|c| c.kind() == "visibility_modifier");
            has_vis
        };
        if let Some(argument) = node.child_by_field_name("argument") {
            collect_use_tree(argument, parsed, "", line, reexport, out);
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_use_declarations(child, parsed, out);
    }
}

/// Flatten a use tree into one import per bound leaf.
fn collect_use_tree(
    node: Node,
    parsed: &ParsedSource,
    prefix: &str,
    line: usize,
    reexport: bool,
    out: &mut Vec<RawImport>,
) {
    let join = |prefix: &str, rest: &str| {
        if prefix.is_empty() {
            rest.to_string()
        } else {
            format!("{}::{}", prefix, rest)
        }
    };
    match node.kind() {
        "identifier" | "crate" | "self" | "super" => {
            let text = parsed.node_text(node);
            out.push(RawImport {
                module: join(prefix, text),
                names: vec![text.to_string()],
                line,
                wildcard: false,
                reexport,
                typing_only: false,
            });
        }
        "scoped_identifier" => {
            let text = parsed.node_text(node);
            let bound = text.rsplit("::").next().unwrap_or(text).to_string();
            out.push(RawImport {
                module: join(prefix, text),
                names: vec![bound],
                line,
                wildcard: false,
                reexport,
                typing_only: false,
            });
        }
        "use_as_clause" => {
            let path = node
                .child_by_field_name("path")
                .map(|n| parsed.node_text(n))
                .unwrap_or("");
            let alias = node
                .child_by_field_name("alias")
                .map(|n| parsed.node_text(n))
                .unwrap_or("");
            out.push(RawImport {
                module: join(prefix, path),
                names: vec![alias.to_string()],
                line,
                wildcard: false,
                reexport,
                typing_only: false,
            });
        }
        "scoped_use_list" => {
            let path = node
                .child_by_field_name("path")
                .map(|n| parsed.node_text(n))
                .unwrap_or("");
            let prefix = join(prefix, path);
            if let Some(list) = node.child_by_field_name("list") {
                collect_use_tree(list, parsed, &prefix, line, reexport, out);
            }
        }
        "use_list" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.is_named() {
                    collect_use_tree(child, parsed, prefix, line, reexport, out);
                }
            }
        }
        "use_wildcard" => {
            let text = parsed.node_text(node);
            let module = text.trim_end_matches('*').trim_end_matches("::");
            out.push(RawImport {
                module: join(prefix, module),
                names: Vec::new(),
                line,
                wildcard: true,
                reexport,
                typing_only: false,
            });
        }
        _ => {}
    }
}

fn import_ranges(node: Node, out: &mut Vec<(usize, usize)>) {
    if node.kind() == "use_declaration" {
        out.push((node.start_byte(), node.end_byte()));
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        import_ranges(child, out);
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageBackend for RustBackend {
    fn language_id(&self) -> &'static str {
        "rust"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn line_comment(&self) -> &'static str {
        "//"
    }

    fn block_comment(&self) -> Option<(&'static str, &'static str)> {
        Some(("/*", "*/"))
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedSource> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse Rust source: {}", path.display()))?;

        Ok(ParsedSource {
            tree,
            source: source.to_vec(),
            path: path.to_string_lossy().to_string(),
        })
    }

    fn extract(&self, parsed: &ParsedSource) -> anyhow::Result<Extraction> {
        let elements = self.extract_elements(parsed)?;
        let imports = self.extract_imports(parsed);

        let mut ranges = Vec::new();
        import_ranges(parsed.tree.root_node(), &mut ranges);
        let references = collect_identifiers(
            parsed.tree.root_node(),
            &parsed.source,
            &IDENT_KINDS,
            &ranges,
        );

        Ok(Extraction {
            elements,
            references,
            imports,
            diagnostics: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_rust(source: &str) -> (RustBackend, ParsedSource) {
        let backend = RustBackend::new();
        let parsed = backend
            .parse(Path::new("test.rs"), source.as_bytes())
            .unwrap();
        (backend, parsed)
    }

    #[test]
    fn test_extract_functions_and_methods() {
        let source = r#"
struct Config;

impl Config {
    fn validate(&self) -> bool {
        true
    }
}

trait Render {
    fn render(&self) -> String {
        String::new()
    }
}

fn main() {}
"#;
        let (backend, parsed) = parse_rust(source);
        let out = backend.extract(&parsed).unwrap();

        assert_eq!(out.find_element("main").unwrap().kind, ElementKind::Function);
        assert_eq!(
            out.find_element("Config.validate").unwrap().kind,
            ElementKind::Method
        );
        assert_eq!(
            out.find_element("Render.render").unwrap().kind,
            ElementKind::Method
        );
        assert_eq!(out.find_element("Config").unwrap().kind, ElementKind::Class);
        assert_eq!(out.find_element("Render").unwrap().kind, ElementKind::Class);
    }

    #[test]
    fn test_complexity() {
        let source = r#"
fn process(x: i32) -> i32 {
    if x > 0 && x < 100 {
        for i in 0..x {
            match i % 3 {
                0 => return i,
                _ => continue,
            }
        }
    }
    0
}
"#;
        let (backend, parsed) = parse_rust(source);
        let out = backend.extract(&parsed).unwrap();

        // 1 + if + && + for + 2 match arms = 6
        let process = out.find_element("process").unwrap();
        assert_eq!(process.complexity, 6);
        // if > for > match
        assert_eq!(process.nesting_depth, 3);
    }

    #[test]
    fn test_attributes_as_decorators() {
        let source = r#"
#[derive(Debug, Clone)]
struct Point;

#[inline]
#[must_use]
fn norm() -> f64 { 0.0 }
"#;
        let (backend, parsed) = parse_rust(source);
        let out = backend.extract(&parsed).unwrap();

        assert_eq!(out.find_element("Point").unwrap().decorators, vec!["derive"]);
        assert_eq!(
            out.find_element("norm").unwrap().decorators,
            vec!["inline", "must_use"]
        );
    }

    #[test]
    fn test_extract_use_declarations() {
        let source = r#"
use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use anyhow::Result as AnyResult;
pub use crate::records::Element;
use rayon::prelude::*;

fn main() {
    let _m: HashMap<i32, i32> = HashMap::new();
}
"#;
        let (backend, parsed) = parse_rust(source);
        let out = backend.extract(&parsed).unwrap();

        let hashmap = out
            .imports
            .iter()
            .find(|i| i.module == "std::collections::HashMap")
            .unwrap();
        assert_eq!(hashmap.names, vec!["HashMap"]);

        let serde_names: Vec<_> = out
            .imports
            .iter()
            .filter(|i| i.module.starts_with("serde"))
            .flat_map(|i| i.names.clone())
            .collect();
        assert_eq!(serde_names, vec!["Serialize", "Deserialize"]);

        let aliased = out
            .imports
            .iter()
            .find(|i| i.names == vec!["AnyResult"])
            .unwrap();
        assert_eq!(aliased.module, "anyhow::Result");

        assert!(out
            .imports
            .iter()
            .any(|i| i.reexport && i.names == vec!["Element"]));

        assert!(out.imports.iter().any(|i| i.wildcard));

        // HashMap is referenced outside imports; Deserialize is not.
        assert!(out.references.contains("HashMap"));
        assert!(!out.references.contains("Deserialize"));
    }
}
