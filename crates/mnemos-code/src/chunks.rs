//! Code-chunk vector index (spec.md §4.C10 step 7, §6 `code/code_chunks.{ann}`
//! + `code_chunks_meta.json`): one record per function/class/method, each
//! embedded from its signature, docstring and a short call summary.

use mnemos_core::prelude::{CallEdge, CodeContext, ProjectArchitecture};
use mnemos_vectorstore::{HashingEncoder, StoreKind, VectorStore};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

/// Every chunk produced from one module's functions/classes/methods,
/// before embedding.
#[derive(Debug, Clone)]
pub struct PendingChunk {
    pub id: String,
    pub module: String,
    pub name: String,
    pub kind: &'static str,
    pub signature: String,
    pub docstring: String,
    pub dependencies: Vec<String>,
    pub key_concepts: Vec<String>,
    pub summary: String,
    pub return_type: Option<String>,
    pub variables_used: Vec<String>,
    pub bases: Vec<String>,
    pub attributes: std::collections::HashMap<String, String>,
    pub methods: Vec<String>,
}

/// Up to the first three distinct called function names, in call order
/// (spec.md §4.C10 step 7: "summary lists up to 3 called function names").
fn summarize_calls(calls: &[CallEdge]) -> (String, Vec<String>) {
    let mut seen = Vec::new();
    for edge in calls {
        if !seen.contains(&edge.function) {
            seen.push(edge.function.clone());
        }
        if seen.len() == 3 {
            break;
        }
    }
    let summary = if seen.is_empty() { String::new() } else { format!("Calls: {}", seen.join(", ")) };
    (summary, seen)
}

/// Builds one chunk per top-level function, class, and method across the
/// whole project graph.
#[must_use]
pub fn build_pending_chunks(architecture: &ProjectArchitecture) -> Vec<PendingChunk> {
    let mut chunks = Vec::new();
    for (module_path, module) in &architecture.modules {
        for (name, func) in &module.functions {
            let (summary, key_concepts) = summarize_calls(&func.calls);
            chunks.push(PendingChunk {
                id: format!("{module_path}::{name}"),
                module: module_path.clone(),
                name: name.clone(),
                kind: "function",
                signature: func.signature.clone(),
                docstring: func.doc.clone().unwrap_or_default(),
                dependencies: func.types.clone(),
                key_concepts,
                summary,
                return_type: func.return_type.clone(),
                variables_used: func.variables_used.clone(),
                bases: Vec::new(),
                attributes: std::collections::HashMap::new(),
                methods: Vec::new(),
            });
        }
        for (class_name, class) in &module.classes {
            chunks.push(PendingChunk {
                id: format!("{module_path}::{class_name}"),
                module: module_path.clone(),
                name: class_name.clone(),
                kind: "class",
                signature: format!("class {class_name}({})", class.bases.join(", ")),
                docstring: class.doc.clone().unwrap_or_default(),
                dependencies: Vec::new(),
                key_concepts: class.methods.keys().cloned().collect(),
                summary: format!("Class with {} methods", class.methods.len()),
                return_type: None,
                variables_used: Vec::new(),
                bases: class.bases.clone(),
                attributes: class.attributes.clone(),
                methods: class.methods.keys().cloned().collect(),
            });
            for (method_name, method) in &class.methods {
                let (summary, key_concepts) = summarize_calls(&method.calls);
                chunks.push(PendingChunk {
                    id: format!("{module_path}::{class_name}::{method_name}"),
                    module: module_path.clone(),
                    name: method_name.clone(),
                    kind: "method",
                    signature: method.signature.clone(),
                    docstring: method.doc.clone().unwrap_or_default(),
                    dependencies: method.types.clone(),
                    key_concepts,
                    summary,
                    return_type: method.return_type.clone(),
                    variables_used: method.variables_used.clone(),
                    bases: Vec::new(),
                    attributes: std::collections::HashMap::new(),
                    methods: Vec::new(),
                });
            }
        }
    }
    chunks.sort_by(|a, b| a.id.cmp(&b.id));
    chunks
}

/// Text embedded for a chunk: signature, docstring, and call summary
/// concatenated, truncated to `max_chars`.
#[must_use]
pub fn embedding_text(chunk: &PendingChunk, max_chars: usize) -> String {
    let mut text = format!("{}\n{}\n{}", chunk.signature, chunk.docstring, chunk.summary);
    if text.chars().count() > max_chars {
        text = text.chars().take(max_chars).collect();
    }
    text
}

fn chunk_to_meta(chunk: &PendingChunk) -> Map<String, Value> {
    let mut meta = Map::new();
    meta.insert("id".to_string(), Value::String(chunk.id.clone()));
    meta.insert("kind".to_string(), Value::String(chunk.kind.to_string()));
    meta.insert("module".to_string(), Value::String(chunk.module.clone()));
    meta.insert("name".to_string(), Value::String(chunk.name.clone()));
    meta.insert("signature".to_string(), Value::String(chunk.signature.clone()));
    meta.insert("docstring".to_string(), Value::String(chunk.docstring.clone()));
    meta.insert("dependencies".to_string(), Value::Array(chunk.dependencies.iter().cloned().map(Value::String).collect()));
    meta.insert("key_concepts".to_string(), Value::Array(chunk.key_concepts.iter().cloned().map(Value::String).collect()));
    meta.insert("summary".to_string(), Value::String(chunk.summary.clone()));
    if let Some(rt) = &chunk.return_type {
        meta.insert("return_type".to_string(), Value::String(rt.clone()));
    }
    meta.insert("variables_used".to_string(), Value::Array(chunk.variables_used.iter().cloned().map(Value::String).collect()));
    meta.insert("bases".to_string(), Value::Array(chunk.bases.iter().cloned().map(Value::String).collect()));
    meta.insert(
        "attributes".to_string(),
        Value::Object(chunk.attributes.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect()),
    );
    meta.insert("methods".to_string(), Value::Array(chunk.methods.iter().cloned().map(Value::String).collect()));
    meta
}

/// Opens the code-chunks vector store at `dir` and rewrites it from
/// scratch with `chunks` (spec.md §4.C10 step 7, run on every full
/// indexing pass). Reuses [`StoreKind::Narrative`] purely for its
/// diagnostic label — the code index is a distinct store rooted at its
/// own directory, not a write into the narrative memory store.
pub fn rebuild_code_vector_store(dir: &Path, chunks: &[PendingChunk], max_chars: usize) -> Result<VectorStore, mnemos_core::MnemosError> {
    // A full rebuild starts from an empty index: dropping stale sidecar
    // files before opening avoids resurrecting deleted symbols.
    let index_path = dir.join("index.ann");
    let metadata_path = dir.join("metadata.json");
    let _ = std::fs::remove_file(&index_path);
    let _ = std::fs::remove_file(&metadata_path);

    let store = VectorStore::open(dir, StoreKind::Narrative, Arc::new(HashingEncoder))?;
    for chunk in chunks {
        let text = embedding_text(chunk, max_chars);
        store.add_fragment(&text, chunk_to_meta(chunk), chunk.id.clone())?;
    }
    Ok(store)
}

/// Hydrates a full [`CodeContext`] from a chunk metadata record.
#[must_use]
pub fn meta_to_context(meta: &Map<String, Value>, score: f64) -> CodeContext {
    let string_vec = |key: &str| -> Vec<String> {
        meta.get(key).and_then(Value::as_array).map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect()).unwrap_or_default()
    };
    let string_map = |key: &str| -> std::collections::HashMap<String, String> {
        meta.get(key)
            .and_then(Value::as_object)
            .map(|o| o.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect())
            .unwrap_or_default()
    };
    let string_field = |key: &str| -> String { meta.get(key).and_then(Value::as_str).unwrap_or_default().to_string() };

    CodeContext {
        id: string_field("id"),
        kind: string_field("kind"),
        module: string_field("module"),
        name: string_field("name"),
        signature: string_field("signature"),
        docstring: string_field("docstring"),
        dependencies: string_vec("dependencies"),
        key_concepts: string_vec("key_concepts"),
        summary: string_field("summary"),
        content: meta.get("content").and_then(Value::as_str).unwrap_or_default().to_string(),
        score,
        return_type: meta.get("return_type").and_then(Value::as_str).map(String::from),
        variables_used: string_vec("variables_used"),
        bases: string_vec("bases"),
        attributes: string_map("attributes"),
        methods: string_vec("methods"),
    }
}
