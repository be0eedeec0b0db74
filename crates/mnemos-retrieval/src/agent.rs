//! `RetrievalAgent` (spec.md §4.C6): the unified read API, composing the
//! vector stores, inverted index, and file locator behind one façade for
//! `mnemos-context` and `mnemos-orchestrator`.

use crate::history::chronological_history;
use crate::index_search::targeted_search;
use crate::maintenance::{classification_counts, rebuild_index, update_index_file, ClassificationCounts};
use crate::project_files::project_file_introspection;
use crate::readmes::{readmes_for_prompt, tech_docs_for_prompt};
use crate::rules::{rule_by_id, rules_by_semantics, rules_by_tag};
use crate::vector_memory::retrieve_vector_context;
use crate::verbatim::verbatim_search;
use mnemos_config::components::RetrievalConfig;
use mnemos_config::PathRegistry;
use mnemos_core::prelude::{Atom, Intent, MnemosError, RetrievalResult};
use mnemos_filelocator::FileLocator;
use mnemos_fulltext::{InvertedIndex, SearchFilter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mnemos_vectorstore::VectorStore;

pub struct RetrievalAgent {
    paths: PathRegistry,
    narrative: Arc<VectorStore>,
    legislative: Arc<VectorStore>,
    index: InvertedIndex,
    locator: FileLocator,
    config: RetrievalConfig,
}

impl RetrievalAgent {
    #[must_use]
    pub fn new(paths: PathRegistry, narrative: Arc<VectorStore>, legislative: Arc<VectorStore>, index: InvertedIndex, config: RetrievalConfig) -> Self {
        let locator = FileLocator::new(config.everything_exe_path.as_deref(), paths.root());
        Self { paths, narrative, legislative, index, locator, config }
    }

    #[must_use]
    pub fn rules_by_tag(&self, tag: &str) -> Vec<Atom> {
        let hits = rules_by_tag(&self.paths.regles(), tag);
        tracing::debug!(agent = "retrieval", tag, hits = hits.len(), "rules_by_tag");
        hits
    }

    #[must_use]
    pub fn rules_by_semantics(&self, query: &str, k: usize) -> Vec<Atom> {
        let hits = rules_by_semantics(&self.legislative, query, k);
        tracing::debug!(agent = "retrieval", k, hits = hits.len(), "rules_by_semantics");
        hits
    }

    #[must_use]
    pub fn rule_by_id(&self, id: &str) -> Option<Atom> {
        rule_by_id(&self.paths.regles(), id)
    }

    #[must_use]
    pub fn readmes_for_prompt(&self, prompt: &str) -> Vec<Atom> {
        let hits = readmes_for_prompt(&self.paths.connaissances(), prompt);
        tracing::debug!(agent = "retrieval", hits = hits.len(), "readmes_for_prompt");
        hits
    }

    #[must_use]
    pub fn tech_docs_for_prompt(&self, prompt: &str) -> Vec<Atom> {
        tech_docs_for_prompt(&self.paths.connaissances_doc_tech(), prompt)
    }

    /// `retrieve_vector_context` at `k=15` (spec.md §4.C6), using the
    /// configured boost factor and final result count.
    #[must_use]
    pub fn vector_context(&self, query: &str, intent: &Intent) -> RetrievalResult {
        let start = std::time::Instant::now();
        let result = retrieve_vector_context(&self.narrative, &self.paths.persistante(), query, 15, intent, self.config.scoring.boost_intention, self.config.limites.resultats_finaux);
        tracing::debug!(
            agent = "retrieval",
            scanned = result.scanned_count,
            returned = result.raw_memories.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "vector_context"
        );
        result
    }

    #[must_use]
    pub fn chronological_history(&self) -> Vec<Atom> {
        chronological_history(&self.paths, self.config.limites.historique_recent)
    }

    #[must_use]
    pub fn verbatim_search(&self, phrase_exact: &str) -> Vec<Atom> {
        let hits = verbatim_search(&self.locator, phrase_exact, self.config.limites.recherche_everything_max);
        tracing::debug!(agent = "retrieval", hits = hits.len(), "verbatim_search");
        hits
    }

    #[must_use]
    pub fn project_file_introspection(&self, query: &str) -> Vec<Atom> {
        project_file_introspection(&self.locator, query, self.config.limites.recherche_everything_max)
    }

    #[must_use]
    pub fn targeted_search(&self, query: &str, filter: Option<&SearchFilter>, whitelist: &[String], k: usize) -> Vec<Atom> {
        targeted_search(&self.index, query, filter, whitelist, k)
    }

    pub fn update_index_file(&self, path: &Path) -> Result<(), MnemosError> {
        update_index_file(&self.index, path)
    }

    pub fn rebuild_index(&self) -> Result<usize, MnemosError> {
        let roots: Vec<PathBuf> = vec![self.paths.historique(), self.paths.regles(), self.paths.connaissances(), self.paths.reflexive()];
        let count = rebuild_index(&self.index, &roots.iter().map(PathBuf::as_path).collect::<Vec<_>>())?;
        tracing::info!(agent = "retrieval", documents = count, "rebuild_index completed");
        Ok(count)
    }

    #[must_use]
    pub fn classification_counts(&self, since: Option<chrono::DateTime<chrono::Utc>>) -> ClassificationCounts {
        classification_counts(&self.paths.historique(), since)
    }

    #[must_use]
    pub fn paths(&self) -> &PathRegistry {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemos_core::prelude::{ActionEnum, CategoryEnum, SubjectEnum};
    use mnemos_vectorstore::encoder::HashingEncoder;
    use mnemos_vectorstore::store::StoreKind;

    fn agent(tmp: &Path) -> RetrievalAgent {
        let paths = PathRegistry::new(tmp);
        paths.ensure_dirs().unwrap();
        let narrative = Arc::new(VectorStore::open(&paths.vectorielle(), StoreKind::Narrative, Arc::new(HashingEncoder)).unwrap());
        let legislative = Arc::new(VectorStore::open(&paths.regles_vecteurs(), StoreKind::Legislative, Arc::new(HashingEncoder)).unwrap());
        let index = InvertedIndex::open_in_memory().unwrap();
        RetrievalAgent::new(paths, narrative, legislative, index, RetrievalConfig::default())
    }

    #[test]
    fn rules_by_tag_reads_through_the_configured_rules_root() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = agent(tmp.path());
        std::fs::write(agent.paths().regles().join("R_TRUTH_1.json"), r#"{"rule": "always cite sources"}"#).unwrap();
        let hits = agent.rules_by_tag("truth");
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn vector_context_applies_configured_intent_boost() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = agent(tmp.path());
        let intent = Intent::new("explain the code", SubjectEnum::Code, ActionEnum::Explain, CategoryEnum::General);
        let result = agent.vector_context("explain the code", &intent);
        assert!(result.raw_memories.is_empty());
    }
}
