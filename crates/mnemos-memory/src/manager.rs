//! `MemoryManager` (spec.md §4.C5): the single writer for all persistent
//! artefacts. Owns the path registry, the dual vectoriser, and the
//! inverted index, and sequences every write through them.

use crate::journal::{append_journal_line, JournalLine};
use crate::reflexive::{journal_reflexive_trace, save_memory};
use crate::turn_store::write_turn;
use crate::vectoriser::DualVectoriser;
use crate::{auditor, code_artifacts};
use mnemos_config::PathRegistry;
use mnemos_core::prelude::{CodeArtifact, Interaction, MnemosError};
use mnemos_fulltext::{DocumentFields, InvertedIndex};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Single writer for all persistent artefacts (spec.md §4.C5). Agents
/// never touch `brute/`, `historique/`, the vector stores, or the
/// inverted index directly — everything funnels through here.
pub struct MemoryManager {
    paths: PathRegistry,
    vectoriser: DualVectoriser,
    index: InvertedIndex,
}

impl MemoryManager {
    #[must_use]
    pub fn new(paths: PathRegistry, vectoriser: DualVectoriser, index: InvertedIndex) -> Self {
        Self { paths, vectoriser, index }
    }

    #[must_use]
    pub fn paths(&self) -> &PathRegistry {
        &self.paths
    }

    #[must_use]
    pub fn vectoriser(&self) -> &DualVectoriser {
        &self.vectoriser
    }

    #[must_use]
    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    /// L0 -> L1 -> L2 -> L3, in that order (spec.md §4.C5). L0 and L1 are
    /// critical: either failing returns `false` without attempting the
    /// rest. L2 and L3 are best-effort: logged on failure, never abort
    /// the turn (spec.md: "L0 is written first and treated as the source
    /// of truth").
    pub fn persist_interaction(&self, interaction: &Interaction) -> bool {
        auditor::audit_and_log(&self.paths, interaction);

        let raw = match serde_json::to_value(interaction) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialise interaction for L0 journal");
                return false;
            }
        };
        if let Err(e) = append_journal_line(&self.paths, &JournalLine::Raw(raw)) {
            tracing::error!(error = %e, interaction_id = %interaction.meta.id, "critical: L0 journal write failed");
            return false;
        }

        let turn_filename = match write_turn(&self.paths, interaction) {
            Ok(filename) => filename,
            Err(e) => {
                tracing::error!(error = %e, interaction_id = %interaction.meta.id, "critical: L1 per-turn write failed");
                return false;
            }
        };

        let combined = format!("{}\n{}", interaction.prompt, interaction.response);
        let mut meta = Map::new();
        meta.insert("kind".to_string(), Value::String("raw_history".to_string()));
        meta.insert("session_id".to_string(), Value::String(interaction.meta.session_id.clone()));
        meta.insert("message_turn".to_string(), Value::Number(interaction.meta.message_turn.into()));
        meta.insert("path".to_string(), Value::String(format!("historique/{turn_filename}")));
        let key = format!("{}_{}", interaction.meta.session_id, interaction.meta.message_turn);
        if let Err(e) = self.vectoriser.vectorise_narrative(&key, &combined, meta) {
            tracing::warn!(error = %e, interaction_id = %interaction.meta.id, "L2 vectorisation failed");
        }

        let fields = DocumentFields {
            path: format!("historique/{turn_filename}"),
            filename: turn_filename,
            content: combined,
            kind: interaction.meta.kind.clone(),
            timestamp: interaction.meta.timestamp.to_rfc3339(),
            subject_tag: interaction.intent.subject.to_string(),
            action_tag: interaction.intent.act.to_string(),
            category_tag: interaction.intent.category.to_string(),
            session_id: interaction.meta.session_id.clone(),
            message_turn: interaction.meta.message_turn as i64,
        };
        if let Err(e) = self.index.update(fields) {
            tracing::warn!(error = %e, interaction_id = %interaction.meta.id, "L3 inverted-index upsert failed");
        }

        true
    }

    /// `save_code_artifacts` (spec.md §4.C5).
    pub fn save_code_artifacts(&self, extension_map: &HashMap<String, String>, artifacts: Vec<CodeArtifact>) -> Result<Vec<CodeArtifact>, MnemosError> {
        code_artifacts::save_code_artifacts(&self.paths, extension_map, artifacts)
    }

    /// `journal_reflexive_trace` (spec.md §4.C5).
    pub fn journal_reflexive_trace(&self, markdown: &str, kind: &str, classification: &str) -> Result<(), MnemosError> {
        journal_reflexive_trace(&self.paths, &self.vectoriser, &self.index, markdown, kind, classification)
    }

    /// `save_memory` (spec.md §4.C5): generic write to any declared
    /// directory under the memory root.
    pub fn save_memory(&self, subdir: &str, filename: &str, content: &Value) -> Result<(), MnemosError> {
        save_memory(&self.paths.root().join(subdir), filename, content)
    }

    /// `vectorise_rule` (spec.md §4.C5): legislative store only, plus an
    /// inverted-index upsert so the rule is retrievable both semantically
    /// and lexically at the next turn.
    pub fn vectorise_rule(&self, key: &str, text: &str, metadata: Map<String, Value>, classification: &str) -> Result<(), MnemosError> {
        self.vectoriser.vectorise_rule(key, text, metadata)?;
        let fields = DocumentFields {
            path: format!("regles/{key}.json"),
            filename: format!("{key}.json"),
            content: text.to_string(),
            kind: "rule".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            subject_tag: String::new(),
            action_tag: String::new(),
            category_tag: classification.to_string(),
            session_id: String::new(),
            message_turn: 0,
        };
        self.index.update(fields)
    }
}
