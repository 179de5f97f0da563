//! JavaScript language backend using tree-sitter.
//!
//! Mirrors the TypeScript backend without the type-system constructs.

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
; Function declarations
(function_declaration
  name: (identifier) @name
) @function

; Generator functions
(generator_function_declaration
  name: (identifier) @name
) @function

; Arrow functions assigned to variables
(variable_declarator
  name: (identifier) @name
  value: (arrow_function)
) @var_function

; Function expressions assigned to variables
(variable_declarator
  name: (identifier) @name
  value: (function_expression)
) @var_function

; Method definitions
(method_definition
  name: (property_identifier) @name
) @method

; Class declarations
(class_declaration
  name: (identifier) @name
) @class
"#;

static DECISION_KINDS: phf::Set<&'static str> = phf_set! {
    "if_statement",
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "switch_case",
    "ternary_expression",
    "catch_clause",
};

static NESTING_KINDS: phf::Set<&'static str> = phf_set! {
    "if_statement",
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "switch_statement",
    "try_statement",
};

static NAMED_ELEMENT_KINDS: phf::Set<&'static str> = phf_set! {
    "function_declaration",
    "generator_function_declaration",
    "method_definition",
    "class_declaration",
};

static IDENT_KINDS: phf::Set<&'static str> = phf_set! {
    "identifier",
    "property_identifier",
    "shorthand_property_identifier",
};

pub struct JavaScriptBackend {
    language: Language,
}

impl JavaScriptBackend {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_javascript::LANGUAGE.into(),
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
            let mut kind = ElementKind::Function;
            let mut is_var_function = false;

            for capture in m.captures {
                match query.capture_names()[capture.index as usize] {
                    "name" => name = parsed.node_text(capture.node).to_string(),
                    "function" => node = Some(capture.node),
                    "var_function" => {
                        node = Some(capture.node);
                        is_var_function = true;
                    }
                    "method" => {
                        node = Some(capture.node);
                        kind = ElementKind::Method;
                    }
                    "class" => {
                        node = Some(capture.node);
                        kind = ElementKind::Class;
                    }
                    _ => {}
                }
            }

            let Some(node) = node else { continue };
            if name.is_empty() || !seen.insert((node.start_byte(), name.clone())) {
                continue;
            }

            if kind == ElementKind::Method {
                if let Some(class) = enclosing_class(node) {
                    if let Some(class_name) = class.child_by_field_name("name") {
                        name = format!("{}.{}", parsed.node_text(class_name), name);
                    }
                }
            }

            let metrics_root = if is_var_function {
                node.child_by_field_name("value").unwrap_or(node)
            } else {
                node
            };

            let start_line = node.start_position().row + 1;
            let line_count = node.end_position().row - node.start_position().row + 1;

            elements.push(StructuralElement {
                name,
                kind,
                file: parsed.path.clone(),
                start_line,
                line_count,
                complexity: 1 + count_decision_points(metrics_root, &is_decision, &is_boundary),
                nesting_depth: max_block_nesting(metrics_root, &is_nesting, &is_boundary),
                decorators: decorator_names(node, parsed),
            });
        }

        elements.sort_by_key(|e| (e.start_line, e.name.clone()));
        Ok(elements)
    }

    fn extract_imports(&self, parsed: &ParsedSource) -> Vec<RawImport> {
        let mut imports = Vec::new();
        collect_module_refs(parsed.tree.root_node(), parsed, &mut imports);
        imports
    }
}

fn is_decision(node: Node) -> bool {
    DECISION_KINDS.contains(node.kind()) || is_short_circuit(node, &["&&", "||", "??"])
}

fn is_nesting(node: Node) -> bool {
    NESTING_KINDS.contains(node.kind())
}

fn is_boundary(node: Node) -> bool {
    if NAMED_ELEMENT_KINDS.contains(node.kind()) {
        return true;
    }
    matches!(node.kind(), "arrow_function" | "function_expression")
        && node
            .parent()
            .map(|p| p.kind() == "variable_declarator")
            .unwrap_or(false)
}

fn enclosing_class(node: Node) -> Option<Node> {
    nearest_ancestor(
        node,
        &["class_declaration"],
        &["function_declaration", "function_expression", "arrow_function"],
    )
}

/// Decorator names attached to a class or method.
fn decorator_names(node: Node, parsed: &ParsedSource) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = node.prev_sibling();
    while let Some(sib) = current {
        if sib.kind() != "decorator" {
            break;
        }
        push_decorator(sib, parsed, &mut names);
        current = sib.prev_sibling();
    }
    names.reverse();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "decorator" {
            push_decorator(child, parsed, &mut names);
        }
    }
    names
}

fn push_decorator(node: Node, parsed: &ParsedSource, names: &mut Vec<String>) {
    let text = parsed.node_text(node);
    let name = text
        .trim_start_matches('@')
        .split('(')
        .next()
        .unwrap_or("")
        .trim();
    if !name.is_empty() && !names.contains(&name.to_string()) {
        names.push(name.to_string());
    }
}

fn string_value(node: Node, parsed: &ParsedSource) -> String {
    parsed
        .node_text(node)
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}

fn collect_module_refs(node: Node, parsed: &ParsedSource, out: &mut Vec<RawImport>) {
    match node.kind() {
        "import_statement" => {
            let line = node.start_position().row + 1;
            let module = node
                .child_by_field_name("source")
                .map(|n| string_value(n, parsed))
                .unwrap_or_default();
            let mut names = Vec::new();
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "import_clause" {
                    collect_import_clause(child, parsed, &mut names);
                }
            }
            out.push(RawImport {
                module,
                names,
                line,
                wildcard: false,
                reexport: false,
                typing_only: false,
            });
        }
        "export_statement" => {
            if let Some(source) = node.child_by_field_name("source") {
                out.push(RawImport {
                    module: string_value(source, parsed),
                    names: Vec::new(),
                    line: node.start_position().row + 1,
                    wildcard: false,
                    reexport: true,
                    typing_only: false,
                });
            } else {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    collect_module_refs(child, parsed, out);
                }
            }
        }
        "call_expression" => {
            if let Some(import) = require_call(node, parsed) {
                out.push(import);
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_module_refs(child, parsed, out);
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_module_refs(child, parsed, out);
            }
        }
    }
}

fn collect_import_clause(clause: Node, parsed: &ParsedSource, names: &mut Vec<String>) {
    let mut cursor = clause.walk();
    for child in clause.children(&mut cursor) {
        match child.kind() {
            "identifier" => names.push(parsed.node_text(child).to_string()),
            "namespace_import" => {
                let mut inner = child.walk();
                for c in child.children(&mut inner) {
                    if c.kind() == "identifier" {
                        names.push(parsed.node_text(c).to_string());
                    }
                }
            }
            "named_imports" => {
                let mut inner = child.walk();
                for spec in child.children(&mut inner) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let bound = spec
                        .child_by_field_name("alias")
                        .or_else(|| spec.child_by_field_name("name"));
                    if let Some(b) = bound {
                        names.push(parsed.node_text(b).to_string());
                    }
                }
            }
            _ => {}
        }
    }
}

fn require_call(node: Node, parsed: &ParsedSource) -> Option<RawImport> {
    let function = node.child_by_field_name("function")?;
    if parsed.node_text(function) != "require" {
        return None;
    }
    let args = node.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let arg = args.children(&mut cursor).find(|c| c.kind() == "string")?;
    let module = string_value(arg, parsed);

    let names = nearest_ancestor(node, &["variable_declarator"], &["statement_block"])
        .and_then(|d| d.child_by_field_name("name"))
        .filter(|n| n.kind() == "identifier")
        .map(|n| vec![parsed.node_text(n).to_string()])
        .unwrap_or_default();

    Some(RawImport {
        module,
        names,
        line: node.start_position().row + 1,
        wildcard: false,
        reexport: false,
        typing_only: false,
    })
}

fn import_ranges(node: Node, out: &mut Vec<(usize, usize)>) {
    if node.kind() == "import_statement" {
        out.push((node.start_byte(), node.end_byte()));
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        import_ranges(child, out);
    }
}

impl Default for JavaScriptBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageBackend for JavaScriptBackend {
    fn language_id(&self) -> &'static str {
        "javascript"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn line_comment(&self) -> &'static str {
        "//"
    }

    fn block_comment(&self) -> Option<(&'static str, &'static str)> {
        Some(("/*", "*/"))
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedSource> {
        let mut parser = self.create_parser()?;
        let tree = parser.parse(source, None).ok_or_else(|| {
            anyhow::anyhow!("failed to parse JavaScript source: {}", path.display())
        })?;

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

    fn parse_js(source: &str) -> (JavaScriptBackend, ParsedSource) {
        let backend = JavaScriptBackend::new();
        let parsed = backend
            .parse(Path::new("test.js"), source.as_bytes())
            .unwrap();
        (backend, parsed)
    }

    #[test]
    fn test_extract_declarations() {
        let source = r#"
function greet(name) {
    return name ? "hi " + name : "hi";
}

const sum = (a, b) => a + b;

class Cart {
    total() {
        return 0;
    }
}
"#;
        let (backend, parsed) = parse_js(source);
        let out = backend.extract(&parsed).unwrap();

        let greet = out.find_element("greet").unwrap();
        assert_eq!(greet.kind, ElementKind::Function);
        // 1 + ternary
        assert_eq!(greet.complexity, 2);

        assert_eq!(out.find_element("sum").unwrap().kind, ElementKind::Function);
        assert_eq!(
            out.find_element("Cart.total").unwrap().kind,
            ElementKind::Method
        );
        assert_eq!(out.find_element("Cart").unwrap().kind, ElementKind::Class);
    }

    #[test]
    fn test_commonjs_imports() {
        let source = r#"
const express = require("express");
const { Router } = require("router");
import fs from "fs";

express();
"#;
        let (backend, parsed) = parse_js(source);
        let out = backend.extract(&parsed).unwrap();

        let exp = out.imports.iter().find(|i| i.module == "express").unwrap();
        assert_eq!(exp.names, vec!["express"]);

        let fs_import = out.imports.iter().find(|i| i.module == "fs").unwrap();
        assert_eq!(fs_import.names, vec!["fs"]);

        assert!(out.references.contains("express"));
    }
}
