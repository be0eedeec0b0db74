//! Named root resolution, grounded on `Metabase/auditor_base.py`'s central
//! auditor: one object answers "where does `historique` live", rather
//! than hard-coding joins all over the agent modules. `PathRegistry` is
//! the Rust equivalent, seeded from the on-disk layout in spec.md §6.

use std::path::{Path, PathBuf};

/// Resolves every named on-disk root relative to a single memory root.
/// Agents hold a `PathRegistry` (or a clone of one — it is cheap, just a
/// `PathBuf`) instead of constructing paths themselves.
#[derive(Debug, Clone)]
pub struct PathRegistry {
    root: PathBuf,
}

impl PathRegistry {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `brute/interactions_YYYY-MM-DD.jsonl` — the append-only daily journal.
    #[must_use]
    pub fn brute(&self) -> PathBuf {
        self.root.join("brute")
    }

    /// `historique/interaction_{subject}_{action}_{category}_{ts}.json`.
    #[must_use]
    pub fn historique(&self) -> PathBuf {
        self.root.join("historique")
    }

    /// `persistante/{SUBJECT}_{ACTION}_{CATEGORY}_{ts}_{4hex}.json`.
    #[must_use]
    pub fn persistante(&self) -> PathBuf {
        self.root.join("persistante")
    }

    /// `reflexive/journal_de_doute_reflexif.md`.
    #[must_use]
    pub fn reflexive(&self) -> PathBuf {
        self.root.join("reflexive")
    }

    /// `reflexive/feedback/feedback_{+1|-1}_{keyword}_{ts}.json`.
    #[must_use]
    pub fn reflexive_feedback(&self) -> PathBuf {
        self.reflexive().join("feedback")
    }

    /// `regles/R_*.json`.
    #[must_use]
    pub fn regles(&self) -> PathBuf {
        self.root.join("regles")
    }

    /// `regles/vecteurs/index.{ann}` + `metadata.json` — legislative store.
    #[must_use]
    pub fn regles_vecteurs(&self) -> PathBuf {
        self.regles().join("vecteurs")
    }

    /// `connaissances/README_*.md`.
    #[must_use]
    pub fn connaissances(&self) -> PathBuf {
        self.root.join("connaissances")
    }

    /// `connaissances/documentation_technique/*`.
    #[must_use]
    pub fn connaissances_doc_tech(&self) -> PathBuf {
        self.connaissances().join("documentation_technique")
    }

    /// `vectorielle/index.{ann}` + `metadata.json` — narrative store.
    #[must_use]
    pub fn vectorielle(&self) -> PathBuf {
        self.root.join("vectorielle")
    }

    /// `code/` root: `code_architecture.json`, `code_chunks.jsonl`,
    /// `code_chunks.{ann}`, `code_chunks_meta.json`, `scripts_skeleton.txt`.
    #[must_use]
    pub fn code(&self) -> PathBuf {
        self.root.join("code")
    }

    /// `code/code_extraits/artifact_YYYYMMDD_{id}.{ext}`.
    #[must_use]
    pub fn code_extraits(&self) -> PathBuf {
        self.code().join("code_extraits")
    }

    /// `.traitement_state.json` — consolidator checkpoint file.
    #[must_use]
    pub fn traitement_state(&self) -> PathBuf {
        self.root.join(".traitement_state.json")
    }

    /// `centre_formation/` — training-dataset directory.
    #[must_use]
    pub fn centre_formation(&self) -> PathBuf {
        self.root.join("centre_formation")
    }

    /// `centre_formation/batch_dataset.jsonl`.
    #[must_use]
    pub fn batch_dataset(&self) -> PathBuf {
        self.centre_formation().join("batch_dataset.jsonl")
    }

    /// Creates every directory this registry names (idempotent: used at
    /// boot before any agent touches disk).
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.brute(),
            self.historique(),
            self.persistante(),
            self.reflexive(),
            self.reflexive_feedback(),
            self.regles(),
            self.regles_vecteurs(),
            self.connaissances(),
            self.connaissances_doc_tech(),
            self.vectorielle(),
            self.code(),
            self.code_extraits(),
            self.centre_formation(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_nest_under_the_memory_root() {
        let registry = PathRegistry::new("/tmp/mem");
        assert_eq!(registry.brute(), PathBuf::from("/tmp/mem/brute"));
        assert_eq!(registry.regles_vecteurs(), PathBuf::from("/tmp/mem/regles/vecteurs"));
        assert_eq!(registry.code_extraits(), PathBuf::from("/tmp/mem/code/code_extraits"));
    }

    #[test]
    fn ensure_dirs_creates_the_full_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = PathRegistry::new(tmp.path());
        registry.ensure_dirs().unwrap();
        assert!(registry.reflexive_feedback().is_dir());
        assert!(registry.connaissances_doc_tech().is_dir());
    }
}
