//! `RetrievalResult` / `ContextResult` (spec.md §3).

use super::atom::Atom;
use super::intent::Intent;
use crate::error::{MnemosError, Result};
use serde::{Deserialize, Serialize};

/// A memory recalled from any read path in `mnemos-retrieval`.
///
/// Distinct from the generic [`Atom::Memory`] variant: a `Memory` here is
/// always the hydrated, concrete record (with a stable identity) that a
/// `RetrievalResult` carries before it is filtered/boosted into atoms.
pub type Memory = super::atom::AtomFields;

/// Raw output of a single vector/history/verbatim read path
/// (spec.md §3 `RetrievalResult`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub raw_memories: Vec<Memory>,
    pub scanned_count: usize,
    pub elapsed_seconds: f64,
}

impl RetrievalResult {
    #[must_use]
    pub fn empty() -> Self {
        Self { raw_memories: Vec::new(), scanned_count: 0, elapsed_seconds: 0.0 }
    }

    /// Sorts `raw_memories` by score descending, ties broken by original
    /// (insertion) order — spec.md §4.C6 ordering guarantee and §8
    /// invariant 3/4.
    pub fn sort_by_score_desc(&mut self) {
        // `sort_by` is stable, so equal scores keep their relative
        // (insertion) order rather than being reordered by `f64` NaN
        // handling quirks from `sort_unstable_by`.
        self.raw_memories.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    }

    /// Truncates to at most `max_items`, preserving score order
    /// (spec.md §8 invariant 3: `|raw_memories| <= min(N, max_items)`).
    pub fn truncate_to(&mut self, max_items: usize) {
        self.raw_memories.truncate(max_items);
    }
}

/// Aggregated context handed to the prompt builder (spec.md §3
/// `ContextResult`). `memory_context`, `active_rules`, and `readmes` are
/// guaranteed non-empty by `mnemos-context`'s fallback injection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResult {
    pub history: Vec<String>,
    pub memory_context: Vec<Memory>,
    pub active_rules: Vec<Atom>,
    pub readmes: Vec<Atom>,
    pub intent: Intent,
}

impl ContextResult {
    /// Validates the schema invariant spec.md §4.C8 calls out explicitly:
    /// memory/rules/readmes must never be empty once the aggregator has
    /// run its fallback-injection pass.
    pub fn validate(&self) -> Result<()> {
        if self.memory_context.is_empty() {
            return Err(MnemosError::schema("ContextResult.memory_context must not be empty"));
        }
        if self.active_rules.is_empty() {
            return Err(MnemosError::schema("ContextResult.active_rules must not be empty"));
        }
        if self.readmes.is_empty() {
            return Err(MnemosError::schema("ContextResult.readmes must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::intent::{ActionEnum, CategoryEnum, Intent, SubjectEnum};

    fn intent() -> Intent {
        Intent::new("hi", SubjectEnum::Unknown, ActionEnum::Unknown, CategoryEnum::Unknown)
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let mut result = RetrievalResult {
            raw_memories: vec![
                Memory { content: "a".into(), title: "a".into(), kind: "memory".into(), score: 0.5 },
                Memory { content: "b".into(), title: "b".into(), kind: "memory".into(), score: 0.9 },
                Memory { content: "c".into(), title: "c".into(), kind: "memory".into(), score: 0.5 },
            ],
            scanned_count: 3,
            elapsed_seconds: 0.01,
        };
        result.sort_by_score_desc();
        let titles: Vec<_> = result.raw_memories.iter().map(|m| m.title.clone()).collect();
        assert_eq!(titles, vec!["b", "a", "c"]);
    }

    #[test]
    fn validate_rejects_empty_sections() {
        let ctx = ContextResult { history: vec![], memory_context: vec![], active_rules: vec![], readmes: vec![], intent: intent() };
        assert!(ctx.validate().is_err());
    }
}
