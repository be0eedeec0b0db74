//! `Atom`: the smallest retrieval result unit (spec.md §3, GLOSSARY).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fields shared by every atom variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AtomFields {
    pub content: String,
    pub title: String,
    pub kind: String,
    pub score: f64,
}

/// The default score assigned to governance rules (spec.md §3).
pub const RULE_DEFAULT_SCORE: f64 = 10.0;

/// A tagged-union retrieval atom. Every output of the retrieval/context
/// layer is one of these three variants — never a generic "any" value
/// (spec.md §9).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "variant")]
pub enum Atom {
    /// A recalled item from the narrative store, history, or a file.
    Memory(AtomFields),
    /// A governance rule (symbolic, semantic, or truth).
    Rule(AtomFields),
    /// A README discovered by the token-subset filter.
    ReadmeFile { fields: AtomFields, path: String },
}

impl Atom {
    #[must_use]
    pub fn memory(content: impl Into<String>, title: impl Into<String>, kind: impl Into<String>, score: f64) -> Self {
        Self::Memory(AtomFields { content: content.into(), title: title.into(), kind: kind.into(), score })
    }

    #[must_use]
    pub fn rule(content: impl Into<String>, title: impl Into<String>) -> Self {
        Self::Rule(AtomFields {
            content: content.into(),
            title: title.into(),
            kind: "rule".to_string(),
            score: RULE_DEFAULT_SCORE,
        })
    }

    #[must_use]
    pub fn readme(content: impl Into<String>, title: impl Into<String>, path: impl Into<String>) -> Self {
        Self::ReadmeFile {
            fields: AtomFields { content: content.into(), title: title.into(), kind: "readme".to_string(), score: 1.0 },
            path: path.into(),
        }
    }

    #[must_use]
    pub fn fields(&self) -> &AtomFields {
        match self {
            Self::Memory(f) | Self::Rule(f) => f,
            Self::ReadmeFile { fields, .. } => fields,
        }
    }

    #[must_use]
    pub fn fields_mut(&mut self) -> &mut AtomFields {
        match self {
            Self::Memory(f) | Self::Rule(f) => f,
            Self::ReadmeFile { fields, .. } => fields,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.fields().title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.fields().content
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.fields().score
    }

    #[must_use]
    pub fn set_score(&mut self, score: f64) {
        self.fields_mut().score = score;
    }

    #[must_use]
    pub fn is_rule(&self) -> bool {
        matches!(self, Self::Rule(_))
    }

    /// Reclassify a `Memory` atom whose `kind == "rule"` into a proper
    /// `Rule` atom, per spec.md §4.C8 step 7.
    #[must_use]
    pub fn reclassify_as_rule(self) -> Self {
        match self {
            Self::Memory(mut f) if f.kind == "rule" => {
                f.score = RULE_DEFAULT_SCORE;
                Self::Rule(f)
            }
            other => other,
        }
    }
}

/// External documentation fetched via the web or a local doc service
/// (spec.md §3 `TechDoc`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechDoc {
    pub content: String,
    pub title: String,
    pub source_url: String,
    pub kind: String,
    pub score: f64,
}

/// The kind of code entity a [`CodeChunk`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeChunkKind {
    Function,
    Method,
    Class,
    Snippet,
    File,
    Active,
}

/// A code preview attached to a prompt (spec.md §3 `CodeChunk`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeChunk {
    pub content: String,
    pub path: String,
    pub kind: CodeChunkKind,
    pub language: String,
}

/// A richer code entity hydrated from a vector-index hit (spec.md §3
/// `CodeContext`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodeContext {
    pub id: String,
    pub kind: String,
    pub module: String,
    pub name: String,
    pub signature: String,
    pub docstring: String,
    pub dependencies: Vec<String>,
    pub key_concepts: Vec<String>,
    pub summary: String,
    pub content: String,
    pub score: f64,
    pub return_type: Option<String>,
    pub variables_used: Vec<String>,
    pub bases: Vec<String>,
    pub attributes: HashMap<String, String>,
    pub methods: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reclassify_memory_with_rule_kind_becomes_rule() {
        let memory = Atom::memory("do X", "R_TEST", "rule", 0.4);
        let reclassified = memory.reclassify_as_rule();
        assert!(reclassified.is_rule());
        assert_eq!(reclassified.score(), RULE_DEFAULT_SCORE);
    }

    #[test]
    fn reclassify_leaves_non_rule_memory_untouched() {
        let memory = Atom::memory("a fact", "title", "raw_history", 0.7);
        let same = memory.clone().reclassify_as_rule();
        assert_eq!(memory, same);
    }
}
