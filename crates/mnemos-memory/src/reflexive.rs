//! `journal_reflexive_trace` and `save_memory` (spec.md §4.C5).

use crate::vectoriser::DualVectoriser;
use chrono::Utc;
use mnemos_config::PathRegistry;
use mnemos_core::MnemosError;
use mnemos_fulltext::{DocumentFields, InvertedIndex};
use serde_json::{Map, Value};

/// Appends `markdown` to the single reflexive journal
/// (`reflexive/journal_de_doute_reflexif.md`), vectorises it into the
/// narrative store with `kind="reflexive"`, and upserts it into the
/// inverted index (spec.md §4.C5).
pub fn journal_reflexive_trace(
    paths: &PathRegistry,
    vectoriser: &DualVectoriser,
    index: &InvertedIndex,
    markdown: &str,
    kind: &str,
    classification: &str,
) -> Result<(), MnemosError> {
    std::fs::create_dir_all(paths.reflexive())?;
    let journal_path = paths.reflexive().join("journal_de_doute_reflexif.md");
    let section = format!("\n\n---\n\n{markdown}\n");
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&journal_path)?;
    std::io::Write::write_all(&mut file, section.as_bytes())?;
    file.flush()?;

    let mut meta = Map::new();
    meta.insert("kind".to_string(), Value::String("reflexive".to_string()));
    meta.insert("classification".to_string(), Value::String(classification.to_string()));
    let key = format!("reflexive_{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
    if let Err(e) = vectoriser.vectorise_narrative(&key, markdown, meta) {
        tracing::warn!(error = %e, "failed to vectorise reflexive trace into narrative store");
    }

    let fields = DocumentFields {
        path: journal_path.to_string_lossy().to_string(),
        filename: "journal_de_doute_reflexif.md".to_string(),
        content: markdown.to_string(),
        kind: kind.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        subject_tag: String::new(),
        action_tag: String::new(),
        category_tag: classification.to_string(),
        session_id: String::new(),
        message_turn: 0,
    };
    if let Err(e) = index.update(fields) {
        tracing::warn!(error = %e, "failed to upsert reflexive trace into inverted index");
    }
    Ok(())
}

/// `save_memory`: generic write to any declared directory. Serialises as
/// pretty JSON when `content` is an object or array, writes raw text
/// otherwise (spec.md §4.C5).
pub fn save_memory(dir: &std::path::Path, filename: &str, content: &Value) -> Result<(), MnemosError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    match content {
        Value::Object(_) | Value::Array(_) => {
            std::fs::write(path, serde_json::to_string_pretty(content)?)?;
        }
        Value::String(s) => {
            std::fs::write(path, s)?;
        }
        other => {
            std::fs::write(path, other.to_string())?;
        }
    }
    Ok(())
}
