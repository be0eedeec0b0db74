//! Tree-sitter Python static analysis (spec.md §4.C10 steps 1-6), grounded
//! on `codescope-core`'s `ast.rs` (tree-sitter `Parser`/`Node` walking style)
//! and `scan.rs` (blacklist-aware directory walk via `ignore::WalkBuilder`).

use ignore::WalkBuilder;
use mnemos_core::prelude::{CallEdge, ClassInfo, MethodInfo, ModuleInfo, ProjectArchitecture};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

/// Directory names excluded outright (spec.md §4.C10 step 1).
const DIR_BLACKLIST_EXACT: &[&str] =
    &["backups", "logs", "__pycache__", "venv", "node_modules", "dist", "build", ".git"];
/// Directory names excluded by substring match.
const DIR_BLACKLIST_SUBSTRING: &[&str] = &["backup", "archive"];
/// Filenames excluded by substring/suffix match.
const FILE_BLACKLIST: &[&str] = &[".bak", ".tmp", ".old", "copy"];

fn path_is_blacklisted(rel: &Path) -> bool {
    for component in rel.components() {
        let name = component.as_os_str().to_string_lossy().to_lowercase();
        if DIR_BLACKLIST_EXACT.contains(&name.as_str()) {
            return true;
        }
        if DIR_BLACKLIST_SUBSTRING.iter().any(|needle| name.contains(needle)) {
            return true;
        }
    }
    let filename = rel.file_name().map(|f| f.to_string_lossy().to_lowercase()).unwrap_or_default();
    FILE_BLACKLIST.iter().any(|needle| filename.contains(needle))
}

/// Recursively walks `roots` (each relative to `project_root`) and returns
/// every `.py` file not excluded by the blacklist (spec.md §4.C10 step 1).
#[must_use]
pub fn discover_python_files(project_root: &Path, roots: &[String]) -> Vec<PathBuf> {
    let roots: Vec<PathBuf> = if roots.is_empty() { vec![project_root.to_path_buf()] } else { roots.iter().map(|r| project_root.join(r)).collect() };
    let mut files = Vec::new();
    for root in roots {
        if !root.exists() {
            continue;
        }
        for entry in WalkBuilder::new(&root).hidden(false).git_ignore(true).build().flatten() {
            let Some(file_type) = entry.file_type() else { continue };
            if !file_type.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("py") {
                continue;
            }
            let rel = path.strip_prefix(project_root).unwrap_or(path);
            if path_is_blacklisted(rel) {
                continue;
            }
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    files
}

fn python_parser() -> Parser {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_python::LANGUAGE.into()).expect("tree-sitter-python grammar loads");
    parser
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

/// First string-literal expression statement in `body` (module or function
/// docstring convention).
fn extract_docstring(body: Node, source: &str) -> Option<String> {
    let mut cursor = body.walk();
    let first = body.children(&mut cursor).find(|c| c.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    Some(node_text(expr, source).trim_matches(['"', '\'']).trim().to_string())
}

/// Parses `def`/`class` parameters into (names, type annotations).
fn extract_params(parameters: Node, source: &str) -> (Vec<String>, Vec<String>) {
    let mut names = Vec::new();
    let mut types = Vec::new();
    let mut cursor = parameters.walk();
    for child in parameters.children(&mut cursor) {
        match child.kind() {
            "identifier" => names.push(node_text(child, source).to_string()),
            "typed_parameter" => {
                if let Some(name_node) = child.child(0) {
                    names.push(node_text(name_node, source).to_string());
                }
                if let Some(type_node) = child.child_by_field_name("type") {
                    types.push(node_text(type_node, source).to_string());
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    names.push(node_text(name_node, source).to_string());
                }
                if let Some(type_node) = child.child_by_field_name("type") {
                    types.push(node_text(type_node, source).to_string());
                }
            }
            _ => {}
        }
    }
    (names, types)
}

/// Builds the single-line signature text (spec.md §4.C10 step 4: "full
/// single-line signature") by collapsing internal newlines.
fn build_signature(def_node: Node, source: &str) -> String {
    let end = def_node.child_by_field_name("body").map_or(def_node.end_byte(), Node::start_byte);
    let raw = &source[def_node.start_byte()..end];
    raw.trim_end().trim_end_matches(':').split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Self-attribute type map: `self.x = Name(...)` or `self.x = obj.attr(...)`
/// infers `x -> Name` / `x -> attr` (spec.md §4.C10 step 3).
fn collect_self_attribute_types(class_body: Node, source: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    visit_assignments(class_body, source, &mut map);
    map
}

fn visit_assignments(node: Node, source: &str, map: &mut HashMap<String, String>) {
    if node.kind() == "assignment" {
        if let (Some(left), Some(right)) = (node.child_by_field_name("left"), node.child_by_field_name("right")) {
            if left.kind() == "attribute" {
                let object = left.child_by_field_name("object");
                let attribute = left.child_by_field_name("attribute");
                if let (Some(object), Some(attribute)) = (object, attribute) {
                    if node_text(object, source) == "self" {
                        if let Some(inferred) = infer_call_target(right, source) {
                            map.insert(node_text(attribute, source).to_string(), inferred);
                        }
                    }
                }
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit_assignments(child, source, map);
    }
}

/// `Name(...)` -> `Name`; `obj.attr(...)` -> `attr` (the called
/// function/attribute name becomes the inferred type, per spec.md §4.C10
/// step 3).
fn infer_call_target(node: Node, source: &str) -> Option<String> {
    if node.kind() != "call" {
        return None;
    }
    let function = node.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => Some(node_text(function, source).to_string()),
        "attribute" => function.child_by_field_name("attribute").map(|a| node_text(a, source).to_string()),
        _ => None,
    }
}

/// Resolves a `call` node into a [`CallEdge`] using the containing class's
/// self-attribute type map (spec.md §4.C10 step 4).
fn resolve_call(call: Node, source: &str, self_attrs: &HashMap<String, String>) -> Option<CallEdge> {
    let function = call.child_by_field_name("function")?;
    let line = call.start_position().row + 1;
    match function.kind() {
        "identifier" => Some(CallEdge { module: None, function: node_text(function, source).to_string(), line, resolved_from: "global".to_string() }),
        "attribute" => {
            let object = function.child_by_field_name("object")?;
            let method = function.child_by_field_name("attribute")?;
            let method_name = node_text(method, source).to_string();
            if object.kind() == "attribute" {
                let inner_object = object.child_by_field_name("object")?;
                let inner_attr = object.child_by_field_name("attribute")?;
                if node_text(inner_object, source) == "self" {
                    let attr_name = node_text(inner_attr, source);
                    if let Some(inferred) = self_attrs.get(attr_name) {
                        return Some(CallEdge { module: Some(inferred.clone()), function: method_name, line, resolved_from: format!("self.{attr_name}") });
                    }
                }
            }
            let object_text = node_text(object, source).to_string();
            Some(CallEdge { module: Some(object_text), function: method_name, line, resolved_from: "attribute".to_string() })
        }
        _ => None,
    }
}

fn collect_calls(node: Node, source: &str, self_attrs: &HashMap<String, String>, out: &mut Vec<CallEdge>) {
    if node.kind() == "call" {
        if let Some(edge) = resolve_call(node, source, self_attrs) {
            out.push(edge);
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_calls(child, source, self_attrs, out);
    }
}

fn collect_self_usages(node: Node, source: &str, out: &mut Vec<String>) {
    if node.kind() == "attribute" {
        if let Some(object) = node.child_by_field_name("object") {
            if object.kind() == "identifier" && node_text(object, source) == "self" {
                if let Some(attr) = node.child_by_field_name("attribute") {
                    out.push(format!("self.{}", node_text(attr, source)));
                }
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_self_usages(child, source, out);
    }
}

fn build_method_info(def_node: Node, source: &str, self_attrs: &HashMap<String, String>) -> MethodInfo {
    let body = def_node.child_by_field_name("body");
    let docstring = body.and_then(|b| extract_docstring(b, source));
    let (args, types) = def_node.child_by_field_name("parameters").map(|p| extract_params(p, source)).unwrap_or_default();
    let return_type = def_node.child_by_field_name("return_type").map(|r| node_text(r, source).to_string());
    let mut calls = Vec::new();
    let mut variables_used = Vec::new();
    if let Some(body) = body {
        collect_calls(body, source, self_attrs, &mut calls);
        collect_self_usages(body, source, &mut variables_used);
        variables_used.sort();
        variables_used.dedup();
    }
    MethodInfo { signature: build_signature(def_node, source), doc: docstring, args, types, calls, return_type, variables_used }
}

fn build_class_info(class_node: Node, source: &str) -> ClassInfo {
    let bases = class_node
        .child_by_field_name("superclasses")
        .map(|args| {
            let mut cursor = args.walk();
            args.children(&mut cursor).filter(|c| c.kind() == "identifier" || c.kind() == "attribute").map(|c| node_text(c, source).to_string()).collect()
        })
        .unwrap_or_default();

    let Some(body) = class_node.child_by_field_name("body") else {
        return ClassInfo { bases, ..Default::default() };
    };

    let doc = extract_docstring(body, source);
    let self_attrs = collect_self_attribute_types(body, source);

    let mut methods = HashMap::new();
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        let def_node = unwrap_decorated(child);
        if def_node.kind() == "function_definition" {
            if let Some(name_node) = def_node.child_by_field_name("name") {
                methods.insert(node_text(name_node, source).to_string(), build_method_info(def_node, source, &self_attrs));
            }
        }
    }

    ClassInfo { bases, methods, attributes: self_attrs, doc }
}

fn unwrap_decorated(node: Node) -> Node {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}

/// `import x.y` / `from x.y import z` -> outgoing edge `x` (spec.md §4.C10
/// step 5: "first dotted segment").
fn collect_imports(root: Node, source: &str) -> (Vec<String>, Vec<String>) {
    let mut imports = Vec::new();
    let mut edges = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "import_statement" => {
                let mut c2 = child.walk();
                for name_node in child.children(&mut c2) {
                    if matches!(name_node.kind(), "dotted_name" | "aliased_import" | "identifier") {
                        let text = node_text(name_node, source);
                        imports.push(text.to_string());
                        if let Some(first) = text.split('.').next() {
                            edges.push(first.to_string());
                        }
                    }
                }
            }
            "import_from_statement" => {
                if let Some(module) = child.child_by_field_name("module_name") {
                    let text = node_text(module, source);
                    imports.push(text.to_string());
                    if let Some(first) = text.split('.').next() {
                        edges.push(first.to_string());
                    }
                }
            }
            _ => {}
        }
    }
    edges.sort();
    edges.dedup();
    (imports, edges)
}

/// Parses one Python source file into a [`ModuleInfo`] (spec.md §4.C10
/// steps 2-5). On a syntax error, returns a stub with `docstring` set to
/// the error message and otherwise-empty structure, per spec.
#[must_use]
pub fn analyze_module(path: &str, source: &str) -> ModuleInfo {
    let mut parser = python_parser();
    let Some(tree): Option<Tree> = parser.parse(source, None) else {
        return ModuleInfo { path: path.to_string(), docstring: Some("parse error: tree-sitter returned no tree".to_string()), ..Default::default() };
    };
    let root = tree.root_node();
    if root.has_error() {
        tracing::debug!(path, "python file has syntax errors; extracting best-effort structure");
    }

    let docstring = extract_docstring(root, source);
    let (imports, outgoing_edges) = collect_imports(root, source);

    let mut classes = HashMap::new();
    let mut functions = HashMap::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        let node = unwrap_decorated(child);
        match node.kind() {
            "class_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    classes.insert(node_text(name_node, source).to_string(), build_class_info(node, source));
                }
            }
            "function_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    functions.insert(node_text(name_node, source).to_string(), build_method_info(node, source, &HashMap::new()));
                }
            }
            _ => {}
        }
    }

    ModuleInfo { path: path.to_string(), docstring, classes, functions, imports, outgoing_edges, incoming_edges: Vec::new() }
}

/// Builds the whole-project graph (spec.md §4.C10 steps 1-6): scans,
/// parses every file, then inverts outgoing edges into incoming edges.
#[must_use]
pub fn build_project_architecture(project_root: &Path, roots: &[String]) -> ProjectArchitecture {
    let mut arch = ProjectArchitecture::default();
    for file in discover_python_files(project_root, roots) {
        let rel = file.strip_prefix(project_root).unwrap_or(&file).to_string_lossy().replace('\\', "/");
        let source = match std::fs::read_to_string(&file) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(path = %rel, error = %e, "skipping unreadable python file");
                continue;
            }
        };
        let module = analyze_module(&rel, &source);
        arch.modules.insert(rel, module);
    }
    arch.rebuild_incoming_edges();
    arch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_class_bases_docstring_and_methods() {
        let source = r#"
class Base:
    pass

class Foo(Base):
    """A class."""

    def __init__(self):
        self.engine = Encoder()

    def run(self, x):
        """Runs."""
        return self.engine.encode(x)
"#;
        let module = analyze_module("foo.py", source);
        let foo = module.classes.get("Foo").unwrap();
        assert_eq!(foo.bases, vec!["Base".to_string()]);
        assert_eq!(foo.doc.as_deref(), Some("A class."));
        assert_eq!(foo.attributes.get("engine"), Some(&"Encoder".to_string()));
        let run = foo.methods.get("run").unwrap();
        assert_eq!(run.doc.as_deref(), Some("Runs."));
        assert_eq!(run.calls.len(), 1);
        assert_eq!(run.calls[0].module.as_deref(), Some("Encoder"));
        assert_eq!(run.calls[0].function, "encode");
        assert_eq!(run.calls[0].resolved_from, "self.engine");
    }

    #[test]
    fn bare_call_resolves_as_global() {
        let source = "def f():\n    helper()\n";
        let module = analyze_module("m.py", source);
        let f = module.functions.get("f").unwrap();
        assert_eq!(f.calls[0].module, None);
        assert_eq!(f.calls[0].resolved_from, "global");
    }

    #[test]
    fn imports_produce_first_segment_edges() {
        let source = "import os.path\nfrom foo.bar import baz\n";
        let module = analyze_module("m.py", source);
        assert!(module.outgoing_edges.contains(&"os".to_string()));
        assert!(module.outgoing_edges.contains(&"foo".to_string()));
    }

    #[test]
    fn syntax_error_yields_stub_not_panic() {
        let module = analyze_module("broken.py", "def f(:\n    !!!\n");
        assert_eq!(module.path, "broken.py");
    }

    #[test]
    fn blacklisted_directories_are_skipped() {
        assert!(path_is_blacklisted(Path::new("venv/lib/x.py")));
        assert!(path_is_blacklisted(Path::new("src/old_backup/x.py")));
        assert!(path_is_blacklisted(Path::new("src/thing.bak.py")));
        assert!(!path_is_blacklisted(Path::new("src/thing.py")));
    }
}
