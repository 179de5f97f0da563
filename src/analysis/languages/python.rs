//! Python language backend using tree-sitter.

use std::path::Path;

use phf::phf_set;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::analysis::walk::{
    collect_identifiers, count_decision_points, max_block_nesting, nearest_ancestor,
};
use crate::analysis::{
    ElementKind, Extraction, LanguageBackend, ParsedSource, RawImport, StructuralElement,
};

const DECLARATION_QUERY: &str = r#"
; Function and method definitions
(function_definition
  name: (identifier) @name
) @function

; Class definitions
(class_definition
  name: (identifier) @name
) @class
"#;

/// Decision points for cyclomatic complexity.
static DECISION_KINDS: phf::Set<&'static str> = phf_set! {
    "if_statement",
    "elif_clause",
    "conditional_expression",
    "for_statement",
    "while_statement",
    "except_clause",
    "case_clause",
    "boolean_operator",
};

/// Control-flow blocks that contribute to nesting depth.
static NESTING_KINDS: phf::Set<&'static str> = phf_set! {
    "if_statement",
    "for_statement",
    "while_statement",
    "try_statement",
    "match_statement",
    "with_statement",
};

/// Nested element subtrees are excluded from the enclosing element's
/// complexity and nesting.
static ELEMENT_BOUNDARY_KINDS: phf::Set<&'static str> = phf_set! {
    "function_definition",
    "class_definition",
    "decorated_definition",
};

static IDENT_KINDS: phf::Set<&'static str> = phf_set! {
    "identifier",
};

pub struct PythonBackend {
    language: Language,
}

impl PythonBackend {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
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
            let mut is_class = false;

            for capture in m.captures {
                match query.capture_names()[capture.index as usize] {
                    "name" => name = parsed.node_text(capture.node).to_string(),
                    "function" => node = Some(capture.node),
                    "class" => {
                        node = Some(capture.node);
                        is_class = true;
                    }
                    _ => {}
                }
            }

            let Some(node) = node else { continue };
            if name.is_empty() || !seen.insert((node.start_byte(), name.clone())) {
                continue;
            }

            let kind = if is_class {
                ElementKind::Class
            } else if let Some(class) = enclosing_class(node) {
                name = format!(
                    "{}.{}",
                    class
                        .child_by_field_name("name")
                        .map(|n| parsed.node_text(n))
                        .unwrap_or(""),
                    name
                );
                ElementKind::Method
            } else {
                ElementKind::Function
            };

            // Span covers the decorated form when decorators are present.
            let span_node = match node.parent() {
                Some(p) if p.kind() == "decorated_definition" => p,
                _ => node,
            };
            let start_line = span_node.start_position().row + 1;
            let line_count = span_node.end_position().row - span_node.start_position().row + 1;

            elements.push(StructuralElement {
                name,
                kind,
                file: parsed.path.clone(),
                start_line,
                line_count,
                complexity: 1 + count_decision_points(node, &is_decision, &is_boundary),
                nesting_depth: max_block_nesting(node, &is_nesting, &is_boundary),
                decorators: decorator_names(node, parsed),
            });
        }

        elements.sort_by_key(|e| (e.start_line, e.name.clone()));
        Ok(elements)
    }

    fn extract_imports(&self, parsed: &ParsedSource) -> Vec<RawImport> {
        let mut imports = Vec::new();
        collect_imports(parsed.tree.root_node(), parsed, &mut imports);
        imports
    }
}

fn is_decision(node: Node) -> bool {
    DECISION_KINDS.contains(node.kind())
}

fn is_nesting(node: Node) -> bool {
    NESTING_KINDS.contains(node.kind())
}

fn is_boundary(node: Node) -> bool {
    ELEMENT_BOUNDARY_KINDS.contains(node.kind())
}

/// The class a definition belongs to, if any. A definition nested inside
/// another function is not a method.
fn enclosing_class(node: Node) -> Option<Node> {
    nearest_ancestor(node, &["class_definition"], &["function_definition"])
}

/// Decorator names for a (possibly decorated) definition node.
fn decorator_names(node: Node, parsed: &ParsedSource) -> Vec<String> {
    let Some(parent) = node.parent() else {
        return Vec::new();
    };
    if parent.kind() != "decorated_definition" {
        return Vec::new();
    }
    let mut names = Vec::new();
    let mut cursor = parent.walk();
    for child in parent.children(&mut cursor) {
        if child.kind() == "decorator" {
            let text = parsed.node_text(child);
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
    }
    names
}

/// Whether an import sits inside an `if TYPE_CHECKING:` block.
fn is_typing_only(node: Node, parsed: &ParsedSource) -> bool {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.kind() == "if_statement" {
            if let Some(cond) = n.child_by_field_name("condition") {
                if parsed.node_text(cond).contains("TYPE_CHECKING") {
                    return true;
                }
            }
        }
        current = n.parent();
    }
    false
}

fn collect_imports(node: Node, parsed: &ParsedSource, out: &mut Vec<RawImport>) {
    match node.kind() {
        "import_statement" => {
            let line = node.start_position().row + 1;
            let typing_only = is_typing_only(node, parsed);
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                match child.kind() {
                    // import a.b binds "a"
                    "dotted_name" => {
                        let module = parsed.node_text(child).to_string();
                        let bound = module.split('.').next().unwrap_or("").to_string();
                        out.push(RawImport {
                            module,
                            names: vec![bound],
                            line,
                            wildcard: false,
                            reexport: false,
                            typing_only,
                        });
                    }
                    "aliased_import" => {
                        let module = child
                            .child_by_field_name("name")
                            .map(|n| parsed.node_text(n).to_string())
                            .unwrap_or_default();
                        let alias = child
                            .child_by_field_name("alias")
                            .map(|n| parsed.node_text(n).to_string())
                            .unwrap_or_default();
                        out.push(RawImport {
                            module,
                            names: vec![alias],
                            line,
                            wildcard: false,
                            reexport: false,
                            typing_only,
                        });
                    }
                    _ => {}
                }
            }
        }
        "import_from_statement" => {
            let line = node.start_position().row + 1;
            let typing_only = is_typing_only(node, parsed);
            let module = node
                .child_by_field_name("module_name")
                .map(|n| parsed.node_text(n).to_string())
                .unwrap_or_default();
            let mut names = Vec::new();
            let mut wildcard = false;
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "wildcard_import" {
                    wildcard = true;
                }
            }
            // The module_name field also matches the "name" pattern below on
            // some grammar versions, so compare byte ranges to skip it.
            let module_node_start = node
                .child_by_field_name("module_name")
                .map(|n| n.start_byte());
            let mut cursor = node.walk();
            for child in node.children_by_field_name("name", &mut cursor) {
                if Some(child.start_byte()) == module_node_start {
                    continue;
                }
                match child.kind() {
                    "dotted_name" => {
                        let text = parsed.node_text(child);
                        if let Some(last) = text.rsplit('.').next() {
                            names.push(last.to_string());
                        }
                    }
                    "aliased_import" => {
                        if let Some(alias) = child.child_by_field_name("alias") {
                            names.push(parsed.node_text(alias).to_string());
                        }
                    }
                    _ => {}
                }
            }
            out.push(RawImport {
                module,
                names,
                line,
                wildcard,
                reexport: false,
                typing_only,
            });
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_imports(child, parsed, out);
            }
        }
    }
}

/// Byte ranges of all import statements, for reference filtering.
fn import_ranges(node: Node, out: &mut Vec<(usize, usize)>) {
    match node.kind() {
        "import_statement" | "import_from_statement" => {
            out.push((node.start_byte(), node.end_byte()));
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                import_ranges(child, out);
            }
        }
    }
}

impl Default for PythonBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageBackend for PythonBackend {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn line_comment(&self) -> &'static str {
        "#"
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedSource> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse Python source: {}", path.display()))?;

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
