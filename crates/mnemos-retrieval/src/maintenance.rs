//! `update_index` maintenance and classification statistics (spec.md
//! §4.C6 "Maintenance").

use chrono::{DateTime, Utc};
use mnemos_core::prelude::Interaction;
use mnemos_core::MnemosError;
use mnemos_fulltext::{DocumentFields, InvertedIndex};
use std::path::Path;

const MEMORY_EXTENSIONS: [&str; 4] = ["json", "jsonl", "txt", "md"];
const BLACKLIST: [&str; 6] = ["backup", "logs", "__pycache__", ".env", ".bak", "copie"];

fn is_blacklisted(path: &Path) -> bool {
    let lower = path.to_string_lossy().to_lowercase();
    BLACKLIST.iter().any(|fragment| lower.contains(fragment))
}

fn has_memory_extension(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|ext| MEMORY_EXTENSIONS.contains(&ext))
}

fn fields_for_file(path: &Path) -> Option<DocumentFields> {
    let content = std::fs::read_to_string(path).ok()?;
    Some(DocumentFields {
        path: path.to_string_lossy().to_string(),
        filename: path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default(),
        content,
        timestamp: Utc::now().to_rfc3339(),
        ..Default::default()
    })
}

/// Per-file atomic upsert: reads and tokenises the target file, updates
/// the inverted index in place (spec.md §4.C6 "Maintenance" (a)).
pub fn update_index_file(index: &InvertedIndex, path: &Path) -> Result<(), MnemosError> {
    let Some(fields) = fields_for_file(path) else {
        return Err(MnemosError::storage(format!("could not read {}", path.display())));
    };
    index.update(fields)
}

/// Full rebuild over every declared memory root, honouring the extension
/// filter and the global blacklist (spec.md §4.C6 "Maintenance" (b)).
pub fn rebuild_index(index: &InvertedIndex, roots: &[&Path]) -> Result<usize, MnemosError> {
    let mut entries = Vec::new();
    for root in roots {
        if !root.is_dir() {
            continue;
        }
        for entry in walkdir::WalkDir::new(root).into_iter().flatten() {
            let path = entry.path();
            if !entry.file_type().is_file() || is_blacklisted(path) || !has_memory_extension(path) {
                continue;
            }
            if let Some(fields) = fields_for_file(path) {
                entries.push(fields);
            }
        }
    }
    let count = entries.len();
    index.update_batch(entries)?;
    Ok(count)
}

/// Classification stats over the per-turn JSON files under `historique/`
/// (spec.md §4.C6 "Statistics queries by classification").
#[derive(Debug, Clone, Default)]
pub struct ClassificationCounts {
    pub by_subject: std::collections::HashMap<String, usize>,
    pub by_action: std::collections::HashMap<String, usize>,
    pub by_category: std::collections::HashMap<String, usize>,
    pub total: usize,
}

/// Scans `historique/`, parsing each file's `Interaction`, optionally
/// restricted to turns at or after `since`, and aggregates counts by
/// subject/action/category.
#[must_use]
pub fn classification_counts(historique_dir: &Path, since: Option<DateTime<Utc>>) -> ClassificationCounts {
    let mut counts = ClassificationCounts::default();
    let Ok(entries) = std::fs::read_dir(historique_dir) else { return counts };
    for entry in entries.flatten() {
        let Ok(raw) = std::fs::read_to_string(entry.path()) else { continue };
        let Ok(interaction) = serde_json::from_str::<Interaction>(&raw) else { continue };
        if let Some(since) = since {
            if interaction.meta.timestamp < since {
                continue;
            }
        }
        *counts.by_subject.entry(interaction.intent.subject.to_string()).or_insert(0) += 1;
        *counts.by_action.entry(interaction.intent.act.to_string()).or_insert(0) += 1;
        *counts.by_category.entry(interaction.intent.category.to_string()).or_insert(0) += 1;
        counts.total += 1;
    }
    counts
}
