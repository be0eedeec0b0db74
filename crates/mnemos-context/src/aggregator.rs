//! `ContextAgent` (spec.md §4.C8): the intent-driven aggregation
//! pipeline — symbolic rules, category triggers, truth rules, a default
//! fallback, semantic rules, READMEs, filtered memories, and session
//! history, all deduplicated by title and validated as a `ContextResult`.

use crate::session_history::SessionHistory;
use mnemos_config::components::{ContextConfig, OrchestratorSessionConfig, PertinenceConfig};
use mnemos_config::PathRegistry;
use mnemos_core::prelude::{Atom, ContextResult, Intent, Memory, RetrievalResult};
use mnemos_retrieval::RetrievalAgent;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

const NO_README_TITLE: &str = "NO_README_REQUIRED";
const NO_MEMORY_TITLE: &str = "NO_MEMORY_FOUND";

pub struct ContextAgent {
    retrieval: Arc<RetrievalAgent>,
    context: ContextConfig,
    session: OrchestratorSessionConfig,
    pertinence: PertinenceConfig,
    history: Mutex<SessionHistory>,
}

impl ContextAgent {
    #[must_use]
    pub fn new(retrieval: Arc<RetrievalAgent>, context: ContextConfig, session: OrchestratorSessionConfig, pertinence: PertinenceConfig) -> Self {
        let mut history = SessionHistory::new(session.max_history_session);
        history.seed_cold_start(retrieval.paths());
        Self { retrieval, context, session, pertinence, history: Mutex::new(history) }
    }

    /// Records a completed turn into the session history ring buffer.
    pub fn record_turn(&self, prompt: &str, response: &str) {
        self.history.lock().push_turn(prompt, response);
    }

    /// Current session history, oldest first (spec.md §4.C9 `Protocol`/
    /// `NewChat` variants both need this snapshot directly, outside the
    /// full aggregation pipeline).
    #[must_use]
    pub fn history_snapshot(&self) -> Vec<String> {
        self.history.lock().snapshot()
    }

    /// The most recent `(prompt, response)` pair recorded, if any —
    /// used by the `+1`/`-1` feedback handler, which never re-runs
    /// retrieval just to name what the feedback is about.
    #[must_use]
    pub fn last_exchange(&self) -> Option<(String, String)> {
        let snapshot = self.history_snapshot();
        let response = snapshot.last()?.strip_prefix("assistant: ")?.to_string();
        let prompt = snapshot.get(snapshot.len().checked_sub(2)?)?.strip_prefix("user: ")?.to_string();
        Some((prompt, response))
    }

    fn push_unique(out: &mut Vec<Atom>, seen: &mut HashSet<String>, atom: Atom) {
        if seen.insert(atom.title().to_string()) {
            out.push(atom);
        }
    }

    /// Runs the full 8-step pipeline (spec.md §4.C8) and returns a
    /// `ContextResult` that already satisfies `ContextResult::validate()`.
    #[must_use]
    pub fn build(&self, prompt: &str, intent: &Intent, retrieval_result: &RetrievalResult) -> ContextResult {
        let mut seen_titles: HashSet<String> = HashSet::new();
        let mut rules: Vec<Atom> = Vec::new();
        let lower_prompt = prompt.to_lowercase();

        // 1. Symbolic rules: regex key -> explicit rule IDs.
        for (pattern, rule_ids) in &self.context.symbolic_rules_map {
            let Ok(re) = Regex::new(pattern) else { continue };
            if !re.is_match(&lower_prompt) {
                continue;
            }
            for id in rule_ids {
                if let Some(atom) = self.retrieval.rule_by_id(id) {
                    Self::push_unique(&mut rules, &mut seen_titles, atom);
                }
            }
        }

        // 2. Category triggers: tag -> regex.
        for (tag, pattern) in &self.context.triggers_categories {
            let Ok(re) = Regex::new(pattern) else { continue };
            if !re.is_match(&lower_prompt) {
                continue;
            }
            for atom in self.retrieval.rules_by_tag(tag) {
                Self::push_unique(&mut rules, &mut seen_titles, atom);
            }
        }

        // 3. Truth rules: reserved tag.
        for atom in self.retrieval.rules_by_tag("truth") {
            Self::push_unique(&mut rules, &mut seen_titles, atom);
        }

        // 4. Default fallback if nothing matched yet.
        if rules.is_empty() {
            Self::push_unique(&mut rules, &mut seen_titles, Atom::rule(self.context.default_rule_content.clone(), self.context.default_rule_title.clone()));
        }

        // 5. Semantic rules: top-k from the legislative store.
        for atom in self.retrieval.rules_by_semantics(prompt, self.context.semantic_rules_top_k) {
            Self::push_unique(&mut rules, &mut seen_titles, atom);
        }

        // 6. READMEs, with a neutral placeholder fallback.
        let mut readmes: Vec<Atom> = Vec::new();
        for atom in self.retrieval.readmes_for_prompt(prompt) {
            Self::push_unique(&mut readmes, &mut seen_titles, atom);
        }
        if readmes.is_empty() {
            Self::push_unique(&mut readmes, &mut seen_titles, Atom::readme("No README required for this request.", NO_README_TITLE, ""));
        }

        // 7. Memories: reclassify rule-kind memories into the rules list,
        // score the rest with the a-priori judge, keep the top N above
        // the relevance threshold.
        let boost_terms = intent.boost_terms();
        let mut scored: Vec<Memory> = Vec::new();
        for memory in &retrieval_result.raw_memories {
            if memory.kind == "rule" {
                let atom = Atom::Memory(memory.clone()).reclassify_as_rule();
                Self::push_unique(&mut rules, &mut seen_titles, atom);
                continue;
            }
            let relevance = mnemos_judge::score(prompt, &memory.content, &memory.title, &boost_terms, &self.pertinence);
            if relevance >= self.session.relevance_threshold {
                let mut scored_memory = memory.clone();
                scored_memory.score = relevance;
                scored.push(scored_memory);
            }
        }
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.session.max_items_context);

        let mut memory_context: Vec<Memory> = Vec::new();
        for memory in scored {
            if seen_titles.insert(memory.title.clone()) {
                memory_context.push(memory);
            }
        }
        if memory_context.is_empty() {
            memory_context.push(Memory { content: "No relevant memory found for this request.".to_string(), title: NO_MEMORY_TITLE.to_string(), kind: "placeholder".to_string(), score: 0.0 });
        }

        // 8. Session history.
        let history = self.history.lock().snapshot();

        let result = ContextResult { history, memory_context, active_rules: rules, readmes, intent: intent.clone() };
        debug_assert!(result.validate().is_ok(), "ContextAgent::build produced an invalid ContextResult");
        tracing::debug!(
            agent = "context",
            rules = result.active_rules.len(),
            readmes = result.readmes.len(),
            memories = result.memory_context.len(),
            history = result.history.len(),
            "ContextAgent::build aggregated"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemos_config::components::RetrievalConfig;
    use mnemos_core::prelude::{ActionEnum, CategoryEnum, SubjectEnum};
    use mnemos_fulltext::InvertedIndex;
    use mnemos_vectorstore::encoder::HashingEncoder;
    use mnemos_vectorstore::store::StoreKind;
    use mnemos_vectorstore::VectorStore;

    fn agent(tmp: &std::path::Path) -> ContextAgent {
        let paths = PathRegistry::new(tmp);
        paths.ensure_dirs().unwrap();
        let narrative = Arc::new(VectorStore::open(&paths.vectorielle(), StoreKind::Narrative, Arc::new(HashingEncoder)).unwrap());
        let legislative = Arc::new(VectorStore::open(&paths.regles_vecteurs(), StoreKind::Legislative, Arc::new(HashingEncoder)).unwrap());
        let index = InvertedIndex::open_in_memory().unwrap();
        let retrieval = Arc::new(RetrievalAgent::new(paths, narrative, legislative, index, RetrievalConfig::default()));
        ContextAgent::new(retrieval, ContextConfig::default(), OrchestratorSessionConfig::default(), PertinenceConfig::default())
    }

    fn intent() -> Intent {
        Intent::new("explain the code", SubjectEnum::Code, ActionEnum::Explain, CategoryEnum::General)
    }

    #[test]
    fn empty_inputs_still_produce_a_valid_context_result() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = agent(tmp.path());
        let result = agent.build("explain the code", &intent(), &RetrievalResult::empty());
        assert!(result.validate().is_ok());
        assert_eq!(result.active_rules[0].title(), "R_DEFAULT_BASE");
        assert_eq!(result.readmes[0].title(), NO_README_TITLE);
        assert_eq!(result.memory_context[0].title, NO_MEMORY_TITLE);
    }

    #[test]
    fn truth_tagged_rules_are_always_retrieved() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = agent(tmp.path());
        std::fs::write(agent.retrieval.paths().regles().join("R_TRUTH_1.json"), r#"{"rule": "always cite sources"}"#).unwrap();
        let result = agent.build("anything at all", &intent(), &RetrievalResult::empty());
        assert!(result.active_rules.iter().any(|a| a.title() == "R_TRUTH_1.json"));
    }

    #[test]
    fn rule_kind_memories_are_reclassified_into_rules() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = agent(tmp.path());
        let mut retrieval_result = RetrievalResult::empty();
        retrieval_result.raw_memories.push(Memory { content: "do X".to_string(), title: "R_FROM_MEMORY".to_string(), kind: "rule".to_string(), score: 0.1 });
        let result = agent.build("explain the code", &intent(), &retrieval_result);
        assert!(result.active_rules.iter().any(|a| a.title() == "R_FROM_MEMORY" && a.score() == mnemos_core::prelude::RULE_DEFAULT_SCORE));
    }

    #[test]
    fn low_relevance_memories_are_dropped_below_threshold() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = agent(tmp.path());
        let mut retrieval_result = RetrievalResult::empty();
        retrieval_result.raw_memories.push(Memory { content: "a recipe for bread".to_string(), title: "unrelated".to_string(), kind: "raw_history".to_string(), score: 0.9 });
        let result = agent.build("explain the retry logic", &intent(), &retrieval_result);
        assert_eq!(result.memory_context[0].title, NO_MEMORY_TITLE);
    }

    #[test]
    fn duplicate_titles_are_deduplicated_across_sections() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = agent(tmp.path());
        std::fs::write(agent.retrieval.paths().regles().join("R_TRUTH_1.json"), r#"{"rule": "always cite sources"}"#).unwrap();
        let mut retrieval_result = RetrievalResult::empty();
        retrieval_result.raw_memories.push(Memory { content: "duplicate".to_string(), title: "R_TRUTH_1.json".to_string(), kind: "raw_history".to_string(), score: 0.0 });
        let result = agent.build("explain the code", &intent(), &retrieval_result);
        let occurrences = result.active_rules.iter().filter(|a| a.title() == "R_TRUTH_1.json").count()
            + result.memory_context.iter().filter(|m| m.title == "R_TRUTH_1.json").count();
        assert_eq!(occurrences, 1);
    }
}
