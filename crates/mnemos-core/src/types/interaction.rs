//! `Interaction`: the canonical persisted record (spec.md §3, §6).

use super::atom::Atom;
use super::intent::Intent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Everything `mnemos-memory` needs to know about a turn besides the
/// prompt/response text itself (spec.md §3 `Interaction.meta`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionMeta {
    pub id: String,
    pub session_id: String,
    pub message_turn: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub source_agent: String,
    pub kind: String,
    pub files_consulted: Vec<String>,
    pub judge_valid: bool,
    pub quality_score: f64,
    pub details: String,
    pub len_content: usize,
    /// The one place a generic value is allowed (spec.md §9): a free-form
    /// bag for snapshotting rules/READMEs/code at post-processing time.
    pub free_data: HashMap<String, Value>,
}

/// The canonical per-turn record (spec.md §3 `Interaction`).
///
/// An `Interaction` exclusively owns its `meta`, `intent`, and attached
/// memory copies (spec.md §3 Ownership) — nothing else in the workspace
/// holds a mutable reference to these once the interaction is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub prompt: String,
    pub response: String,
    pub system: String,
    pub intent: Intent,
    pub memory_context: Vec<Atom>,
    pub meta: InteractionMeta,
}

impl Interaction {
    /// Enum fields are persisted as uppercase strings on disk (spec.md §6).
    #[must_use]
    pub fn classification_path_fragment(&self) -> String {
        format!("{}_{}_{}", self.intent.subject.to_string().to_uppercase(), self.intent.act.to_string().to_uppercase(), self.intent.category.to_string().to_uppercase())
    }
}
