//! Go language backend using tree-sitter.

use std::path::Path;

use phf::phf_set;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::analysis::walk::{
    collect_identifiers, count_decision_points, is_short_circuit, max_block_nesting,
};
use crate::analysis::{
    ElementKind, Extraction, LanguageBackend, ParsedSource, RawImport, StructuralElement,
};

const DECLARATION_QUERY: &str = r#"
; Function declarations
(function_declaration
  name: (identifier) @name
) @function

; Method declarations
(method_declaration
  name: (field_identifier) @name
) @method

; Struct type definitions
(type_declaration
  (type_spec
    name: (type_identifier) @name
    type: (struct_type)
  )
) @type_def

; Interface type definitions
(type_declaration
  (type_spec
    name: (type_identifier) @name
    type: (interface_type)
  )
) @type_def
"#;

static DECISION_KINDS: phf::Set<&'static str> = phf_set! {
    "if_statement",
    "for_statement",
    "expression_case",
    "type_case",
    "communication_case",
};

static NESTING_KINDS: phf::Set<&'static str> = phf_set! {
    "if_statement",
    "for_statement",
    "expression_switch_statement",
    "type_switch_statement",
    "select_statement",
};

static ELEMENT_BOUNDARY_KINDS: phf::Set<&'static str> = phf_set! {
    "function_declaration",
    "method_declaration",
    "type_declaration",
};

static IDENT_KINDS: phf::Set<&'static str> = phf_set! {
    "identifier",
    "type_identifier",
    "field_identifier",
    "package_identifier",
};

pub struct GoBackend {
    language: Language,
}

impl GoBackend {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_go::LANGUAGE.into(),
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

            for capture in m.captures {
                match query.capture_names()[capture.index as usize] {
                    "name" => name = parsed.node_text(capture.node).to_string(),
                    "function" => node = Some(capture.node),
                    "method" => {
                        node = Some(capture.node);
                        kind = ElementKind::Method;
                    }
                    "type_def" => {
                        node = Some(capture.node);
                        kind = ElementKind::Class;
                    }
                    _ => {}
                }
            }

            let Some(node) = node else { continue };
            if name.is_empty() {
                continue;
            }

            if kind == ElementKind::Method {
                if let Some(recv) = receiver_type(node, parsed) {
                    name = format!("{}.{}", recv, name);
                }
            }
            if !seen.insert((node.start_byte(), name.clone())) {
                continue;
            }

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
                decorators: Vec::new(),
            });
        }

        elements.sort_by_key(|e| (e.start_line, e.name.clone()));
        Ok(elements)
    }

    fn extract_imports(&self, parsed: &ParsedSource) -> Vec<RawImport> {
        let mut imports = Vec::new();
        collect_import_specs(parsed.tree.root_node(), parsed, &mut imports);
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

/// Receiver type name for a method (e.g. "Config" for `func (c *Config)`),
/// stripped of pointers and generics.
fn receiver_type(node: Node, parsed: &ParsedSource) -> Option<String> {
    let receiver = node.child_by_field_name("receiver")?;
    let mut cursor = receiver.walk();
    let param = receiver
        .children(&mut cursor)
        .find(|c| c.kind() == "parameter_declaration")?;
    let ty = param.child_by_field_name("type")?;
    let text = parsed.node_text(ty).trim_start_matches('*');
    Some(text.split('[').next().unwrap_or(text).trim().to_string())
}

fn collect_import_specs(node: Node, parsed: &ParsedSource, out: &mut Vec<RawImport>) {
    if node.kind() == "import_spec" {
        let line = node.start_position().row + 1;
        let module = node
            .child_by_field_name("path")
            .map(|n| parsed.node_text(n).trim_matches('"').to_string())
            .unwrap_or_default();
        let alias = node.child_by_field_name("name");
        let (names, wildcard) = match alias {
            Some(a) if a.kind() == "dot" => (Vec::new(), true),
            Some(a) if a.kind() == "blank_identifier" => (Vec::new(), false),
            Some(a) => (vec![parsed.node_text(a).to_string()], false),
            // Default binding is the last path segment.
            None => (
                module
                    .rsplit('/')
                    .next()
                    .map(|s| vec![s.to_string()])
                    .unwrap_or_default(),
                false,
            ),
        };
        out.push(RawImport {
            module,
            names,
            line,
            wildcard,
            reexport: false,
            typing_only: false,
        });
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_import_specs(child, parsed, out);
    }
}

fn import_ranges(node: Node, out: &mut Vec<(usize, usize)>) {
    if node.kind() == "import_declaration" {
        out.push((node.start_byte(), node.end_byte()));
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        import_ranges(child, out);
    }
}

impl Default for GoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageBackend for GoBackend {
    fn language_id(&self) -> &'static str {
        "go"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["go"]
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
            .ok_or_else(|| anyhow::anyhow!("failed to parse Go source: {}", path.display()))?;

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
