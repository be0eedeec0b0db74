//! `CodeSubsystem` (spec.md §4.C10): the RAG-facing facade the
//! orchestrator and context agent call into for code-aware retrieval,
//! grounded on `agent_Code.py`'s `fournir_contexte` / `rafraichir_index`.

use crate::analyzer::build_project_architecture;
use crate::chunks::{build_pending_chunks, meta_to_context, rebuild_code_vector_store};
use crate::skeleton::{full_skeleton, skeleton_for as skeleton_for_modules};
use mnemos_config::CodeConfig;
use mnemos_core::prelude::{CodeContext, MnemosError, ProjectArchitecture};
use mnemos_vectorstore::VectorStore;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const ARCHITECTURE_FILE: &str = "code_architecture.json";
const SKELETON_FILE: &str = "scripts_skeleton.txt";
/// Sub-directory the chunk index lives under (see DESIGN.md: `VectorStore`
/// hard-codes `index.ann`/`metadata.json` inside whatever directory it is
/// opened on, so the code-chunks store gets its own nested directory
/// rather than reusing the flat `code/code_chunks.{ann}` filename spec.md
/// names literally).
const CHUNKS_DIR: &str = "code_chunks";

/// Holds the in-memory project graph and chunk index, reloadable without
/// restarting the process (spec.md §4.C10: "Hot-reload").
pub struct CodeSubsystem {
    code_dir: PathBuf,
    config: CodeConfig,
    architecture: RwLock<ProjectArchitecture>,
    vector_store: RwLock<Arc<VectorStore>>,
    http: reqwest::Client,
}

impl CodeSubsystem {
    /// Opens (or creates empty) the code subsystem rooted at `code_dir`
    /// (spec.md §6 `code/`).
    pub fn open(code_dir: &Path, config: CodeConfig) -> Result<Self, MnemosError> {
        std::fs::create_dir_all(code_dir)?;
        let architecture = load_architecture(code_dir).unwrap_or_default();
        let chunks_dir = code_dir.join(CHUNKS_DIR);
        let vector_store = Arc::new(VectorStore::open(&chunks_dir, mnemos_vectorstore::StoreKind::Narrative, Arc::new(mnemos_vectorstore::HashingEncoder))?);
        let http = reqwest::Client::builder().timeout(Duration::from_secs(2)).build().map_err(|e| MnemosError::configuration(format!("building http client: {e}")))?;
        Ok(Self { code_dir: code_dir.to_path_buf(), config, architecture: RwLock::new(architecture), vector_store: RwLock::new(vector_store), http })
    }

    /// Full indexing pass (spec.md §4.C10 steps 1-8): scan, parse, build
    /// the graph, write it and the skeleton to disk, rebuild the chunk
    /// vector index. Also the body of `refresh_index`/hot-reload.
    pub fn index_project(&self, project_root: &Path) -> Result<(), MnemosError> {
        let architecture = build_project_architecture(project_root, &self.config.scan_roots);
        persist_architecture(&self.code_dir, &architecture)?;
        std::fs::write(self.code_dir.join(SKELETON_FILE), full_skeleton(&architecture))?;

        let chunks = build_pending_chunks(&architecture);
        let chunks_dir = self.code_dir.join(CHUNKS_DIR);
        let new_store = rebuild_code_vector_store(&chunks_dir, &chunks, self.config.chunk_max_chars)?;

        *self.architecture.write() = architecture;
        *self.vector_store.write() = Arc::new(new_store);
        tracing::info!(chunks = chunks.len(), "code index rebuilt");
        Ok(())
    }

    /// Re-runs a full index and swaps in the fresh graph/store
    /// (spec.md §4.C10: "on successful worker run, rebuild the in-memory
    /// offset map, re-read the project graph, and reload the embedder
    /// and index"). Triggered by the file watcher or on demand.
    pub fn refresh_index(&self, project_root: &Path) -> Result<(), MnemosError> {
        self.index_project(project_root)
    }

    /// `fournir_contexte` / `provide_context(question, k)` (spec.md
    /// §4.C10): vector search, then keyword search over module names
    /// longer than 3 characters, then a one-hop graph expansion over the
    /// matched modules' outgoing edges. Never raises — on internal
    /// failure, returns a single error-marked placeholder, mirroring the
    /// Python original's `try/except` wrapping the whole method.
    #[must_use]
    pub fn provide_context(&self, question: &str, k: usize) -> Vec<CodeContext> {
        match self.provide_context_inner(question, k) {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "code context retrieval failed, returning placeholder");
                vec![CodeContext { kind: "error".to_string(), summary: format!("code context unavailable: {e}"), ..Default::default() }]
            }
        }
    }

    fn provide_context_inner(&self, question: &str, k: usize) -> Result<Vec<CodeContext>, MnemosError> {
        let store = self.vector_store.read().clone();
        let mut results: Vec<CodeContext> = Vec::new();
        let mut seen_ids = std::collections::HashSet::new();

        for hit in store.search(question, k)? {
            let ctx = meta_to_context(&hit.meta, f64::from(hit.score));
            if seen_ids.insert(ctx.id.clone()) {
                results.push(ctx);
            }
        }

        let architecture = self.architecture.read();
        let question_lower = question.to_lowercase();
        let mut matched_modules: Vec<String> = Vec::new();
        for module_path in architecture.modules.keys() {
            let stem = Path::new(module_path).file_stem().and_then(|s| s.to_str()).unwrap_or(module_path);
            if stem.len() > 3 && question_lower.contains(&stem.to_lowercase()) {
                matched_modules.push(module_path.clone());
                if let Some(module) = architecture.modules.get(module_path) {
                    for (name, func) in &module.functions {
                        let id = format!("{module_path}::{name}");
                        if seen_ids.insert(id.clone()) {
                            results.push(CodeContext {
                                id,
                                kind: "function".to_string(),
                                module: module_path.clone(),
                                name: name.clone(),
                                signature: func.signature.clone(),
                                docstring: func.doc.clone().unwrap_or_default(),
                                score: 0.5,
                                return_type: func.return_type.clone(),
                                variables_used: func.variables_used.clone(),
                                ..Default::default()
                            });
                        }
                    }
                }
            }
        }

        // One-hop graph expansion: modules imported by the matched set.
        for module_path in &matched_modules {
            if let Some(module) = architecture.modules.get(module_path) {
                for edge in &module.outgoing_edges {
                    if let Some((neighbor_path, neighbor)) = architecture.modules.iter().find(|(p, _)| p.starts_with(edge.as_str())) {
                        let id = format!("{neighbor_path}::__module__");
                        if seen_ids.insert(id.clone()) {
                            results.push(CodeContext {
                                id,
                                kind: "module".to_string(),
                                module: neighbor_path.clone(),
                                docstring: neighbor.docstring.clone().unwrap_or_default(),
                                score: 0.2,
                                ..Default::default()
                            });
                        }
                    }
                }
            }
        }

        Ok(results)
    }

    /// Full whole-project skeleton view.
    #[must_use]
    pub fn full_skeleton(&self) -> String {
        full_skeleton(&self.architecture.read())
    }

    /// Targeted skeleton view over named modules (`skeleton_for`,
    /// grounded on `_generer_squelette_partiel`).
    #[must_use]
    pub fn skeleton_for(&self, modules: &[String]) -> String {
        skeleton_for_modules(&self.architecture.read(), modules)
    }

    /// `True` if `question` names one of the configured critical
    /// libraries, triggering `consult_external_docs`.
    #[must_use]
    pub fn mentions_critical_library(&self, question: &str) -> bool {
        let lower = question.to_lowercase();
        self.config.critical_libraries.iter().any(|lib| lower.contains(&lib.to_lowercase()))
    }

    /// `consulter_documentation_externe` / `consult_external_docs(query)`:
    /// an optional local HTTP call to a documentation service, 2s
    /// timeout, empty string on any connection failure (fail-open per
    /// spec.md §4.C10).
    pub async fn consult_external_docs(&self, query: &str) -> String {
        let Some(base_url) = &self.config.external_docs_url else {
            return String::new();
        };
        let response = self.http.get(base_url).query(&[("q", query)]).send().await;
        match response {
            Ok(resp) => resp.text().await.unwrap_or_default(),
            Err(e) => {
                tracing::debug!(error = %e, "external docs lookup failed, continuing without it");
                String::new()
            }
        }
    }
}

fn load_architecture(code_dir: &Path) -> Option<ProjectArchitecture> {
    let path = code_dir.join(ARCHITECTURE_FILE);
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

fn persist_architecture(code_dir: &Path, architecture: &ProjectArchitecture) -> Result<(), MnemosError> {
    let serialized = serde_json::to_string(architecture)?;
    std::fs::write(code_dir.join(ARCHITECTURE_FILE), serialized)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sample_project(root: &Path) {
        std::fs::write(
            root.join("util.py"),
            "class Helper:\n    \"\"\"Helper class.\"\"\"\n    def run(self):\n        return 1\n",
        )
        .unwrap();
    }

    #[test]
    fn index_then_provide_context_finds_matching_class() {
        let project = tempfile::tempdir().unwrap();
        write_sample_project(project.path());
        let code_dir = tempfile::tempdir().unwrap();
        let subsystem = CodeSubsystem::open(code_dir.path(), CodeConfig::default()).unwrap();
        subsystem.index_project(project.path()).unwrap();

        let hits = subsystem.provide_context("util helper", 5);
        assert!(!hits.is_empty());
    }

    #[test]
    fn skeleton_reflects_indexed_project() {
        let project = tempfile::tempdir().unwrap();
        write_sample_project(project.path());
        let code_dir = tempfile::tempdir().unwrap();
        let subsystem = CodeSubsystem::open(code_dir.path(), CodeConfig::default()).unwrap();
        subsystem.index_project(project.path()).unwrap();
        assert!(subsystem.full_skeleton().contains("Helper"));
    }

    #[test]
    fn critical_library_detection_is_case_insensitive() {
        let code_dir = tempfile::tempdir().unwrap();
        let mut config = CodeConfig::default();
        config.critical_libraries = vec!["Torch".to_string()];
        let subsystem = CodeSubsystem::open(code_dir.path(), config).unwrap();
        assert!(subsystem.mentions_critical_library("how do I use torch tensors?"));
        assert!(!subsystem.mentions_critical_library("how do I use pandas?"));
    }

    #[tokio::test]
    async fn consult_external_docs_is_empty_without_configured_url() {
        let code_dir = tempfile::tempdir().unwrap();
        let subsystem = CodeSubsystem::open(code_dir.path(), CodeConfig::default()).unwrap();
        assert_eq!(subsystem.consult_external_docs("anything").await, "");
    }
}
