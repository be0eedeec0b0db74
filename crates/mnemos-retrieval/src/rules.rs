//! Rules by tag and rules by semantics (spec.md §4.C6).

use mnemos_core::prelude::Atom;
use mnemos_vectorstore::VectorStore;
use std::path::Path;

/// Finds JSON files under `regles_dir` whose filename contains `tag`,
/// parses the `"rule"` field (falling back to the raw file contents on a
/// decode error), and yields `Rule` atoms with `score=10.0` (spec.md
/// §4.C6 "Rules by tag").
#[must_use]
pub fn rules_by_tag(regles_dir: &Path, tag: &str) -> Vec<Atom> {
    let Ok(entries) = std::fs::read_dir(regles_dir) else { return Vec::new() };
    let mut out = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().to_string();
        if !filename.to_lowercase().contains(&tag.to_lowercase()) {
            continue;
        }
        let Ok(raw) = std::fs::read_to_string(&path) else { continue };
        let body = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Object(map)) => match map.get("rule").and_then(|v| v.as_str()) {
                Some(rule_text) => rule_text.to_string(),
                None => raw.clone(),
            },
            _ => raw.clone(),
        };
        out.push(Atom::rule(body, filename));
    }
    out
}

/// Reads a single rule file by ID (with or without a trailing `.json`),
/// mirroring [`rules_by_tag`]'s JSON-field handling (spec.md §4.C8 step 1
/// "symbolic rules": retrieve the listed rule IDs through C6).
#[must_use]
pub fn rule_by_id(regles_dir: &Path, id: &str) -> Option<Atom> {
    let filename = if id.ends_with(".json") { id.to_string() } else { format!("{id}.json") };
    let path = regles_dir.join(&filename);
    let raw = std::fs::read_to_string(&path).ok()?;
    let body = match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(serde_json::Value::Object(map)) => match map.get("rule").and_then(|v| v.as_str()) {
            Some(rule_text) => rule_text.to_string(),
            None => raw.clone(),
        },
        _ => raw.clone(),
    };
    Some(Atom::rule(body, filename))
}

/// Queries the legislative vector store semantically and maps each hit
/// to a `Rule` atom titled `"{trigger} (sim: s.ss)"`, `kind =
/// "vectorial_rule"` (spec.md §4.C6 "Rules by semantics").
#[must_use]
pub fn rules_by_semantics(legislative: &VectorStore, query: &str, k: usize) -> Vec<Atom> {
    let Ok(hits) = legislative.search(query, k) else { return Vec::new() };
    hits.into_iter()
        .map(|hit| {
            let trigger = hit.meta.get("trigger").and_then(|v| v.as_str()).unwrap_or("rule").to_string();
            let title = format!("{trigger} (sim: {:.2})", hit.score);
            let content = hit.meta.get("content").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            Atom::Memory(mnemos_core::prelude::AtomFields {
                content,
                title,
                kind: "vectorial_rule".to_string(),
                score: f64::from(hit.score),
            })
        })
        .collect()
}
