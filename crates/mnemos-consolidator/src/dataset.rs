//! Training dataset quality gate (spec.md §4.C13 step 2, last bullet):
//! filters low-value prompts out of `batch_dataset.jsonl` and — to keep
//! the dataset from filling up with trivially-repeated turns — drops
//! near-duplicates of what's already been written.

use mnemos_core::prelude::{Intent, MnemosError, SubjectEnum};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

const DROP_PREFIXES: [&str; 6] = ["+1", "-1", "recherche_web", "rechercher_memoire", "exit", "quit"];
const MIN_CHARS: usize = 10;
const MIN_WORDS: usize = 3;
const MAX_CONTENT_CHARS: usize = 2000;
/// Two prompts are near-duplicates when their word-trigram Jaccard
/// similarity is at or above this threshold.
const NEAR_DUPLICATE_THRESHOLD: f64 = 0.9;
/// Bounds the in-memory trigram cache so the gate stays cheap even on a
/// dataset file with a long history.
const DEDUP_WINDOW: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct DatasetRecord {
    pub prompt: String,
    pub subject: String,
    pub action: String,
    pub category: String,
    pub summary: String,
}

/// Whether `prompt`/`intent` pass the quality gate, independent of
/// deduplication (spec.md §4.C13: drop command-like prefixes, too-short
/// prompts, and unknown-subject turns).
#[must_use]
pub fn passes_quality_gate(prompt: &str, intent: &Intent) -> bool {
    let trimmed = prompt.trim();
    let lower = trimmed.to_lowercase();
    if DROP_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return false;
    }
    if trimmed.chars().count() < MIN_CHARS {
        return false;
    }
    if trimmed.split_whitespace().count() < MIN_WORDS {
        return false;
    }
    if intent.subject == SubjectEnum::Unknown {
        return false;
    }
    true
}

#[must_use]
pub fn truncate_content(content: &str) -> String {
    if content.chars().count() <= MAX_CONTENT_CHARS {
        content.to_string()
    } else {
        content.chars().take(MAX_CONTENT_CHARS).collect()
    }
}

fn word_trigrams(text: &str) -> HashSet<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < 3 {
        return [words.join(" ")].into_iter().collect();
    }
    words.windows(3).map(|w| w.join(" ")).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Maintains a bounded window of recent prompt trigram-sets and decides
/// whether a new prompt is a near-duplicate of anything already
/// written to the dataset file.
pub struct DatasetGate {
    recent: Vec<HashSet<String>>,
}

impl DatasetGate {
    /// Seeds the dedup window from any prompts already present in
    /// `path`, so a restarted consolidator doesn't re-admit duplicates
    /// of records from a previous run.
    #[must_use]
    pub fn seeded_from(path: &Path) -> Self {
        let mut recent = Vec::new();
        if let Ok(raw) = std::fs::read_to_string(path) {
            for line in raw.lines().rev().take(DEDUP_WINDOW) {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
                    if let Some(prompt) = value.get("prompt").and_then(|v| v.as_str()) {
                        recent.push(word_trigrams(prompt));
                    }
                }
            }
        }
        Self { recent }
    }

    #[must_use]
    pub fn is_near_duplicate(&self, prompt: &str) -> bool {
        let trigrams = word_trigrams(prompt);
        self.recent.iter().any(|seen| jaccard(seen, &trigrams) >= NEAR_DUPLICATE_THRESHOLD)
    }

    /// Appends `record` to `path` as one JSON line, provided it isn't a
    /// near-duplicate of a recently-written prompt. Returns whether the
    /// record was written.
    pub fn consider_and_append(&mut self, path: &Path, record: &DatasetRecord) -> Result<bool, MnemosError> {
        if self.is_near_duplicate(&record.prompt) {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(record)?;
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        std::io::Write::write_all(&mut file, format!("{line}\n").as_bytes())?;

        self.recent.push(word_trigrams(&record.prompt));
        if self.recent.len() > DEDUP_WINDOW {
            self.recent.remove(0);
        }
        Ok(true)
    }
}
