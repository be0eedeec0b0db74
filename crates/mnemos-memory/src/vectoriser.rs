//! Dual-engine vectoriser (spec.md GLOSSARY, §4.C5): two independent
//! vector stores — narrative (memories, reflexive traces) and
//! legislative (rules) — wired so a caller cannot accidentally write a
//! rule into the narrative store or vice versa. `vectorise_rule` only
//! ever touches `legislative` (spec.md §8 invariant 5).

use mnemos_core::MnemosError;
use mnemos_vectorstore::{Meta, VectorStore};
use std::sync::Arc;

/// Holds both vector-store instances. Cheap to clone (both fields are
/// `Arc`s); held by `MemoryManager` and by `mnemos-retrieval`'s read
/// paths alike, so both sides share the same underlying index.
#[derive(Clone)]
pub struct DualVectoriser {
    narrative: Arc<VectorStore>,
    legislative: Arc<VectorStore>,
}

impl DualVectoriser {
    #[must_use]
    pub fn new(narrative: Arc<VectorStore>, legislative: Arc<VectorStore>) -> Self {
        Self { narrative, legislative }
    }

    #[must_use]
    pub fn narrative(&self) -> &Arc<VectorStore> {
        &self.narrative
    }

    #[must_use]
    pub fn legislative(&self) -> &Arc<VectorStore> {
        &self.legislative
    }

    /// Vectorises raw-history text and reflexive traces into the
    /// narrative store (spec.md §4.C5 L2, `journal_reflexive_trace`).
    pub fn vectorise_narrative(&self, key: impl Into<String>, text: &str, meta: Meta) -> Result<(), MnemosError> {
        self.narrative.add_fragment(text, meta, key)
    }

    /// `vectorise_rule`: writes to the legislative store **only**, never
    /// narrative (spec.md §4.C5, §8 invariant 5 — structural separation
    /// so rules never contaminate narrative retrieval).
    pub fn vectorise_rule(&self, key: impl Into<String>, text: &str, meta: Meta) -> Result<(), MnemosError> {
        self.legislative.add_fragment(text, meta, key)
    }
}
