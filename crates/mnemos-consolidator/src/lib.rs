//! Deferred Consolidator (spec.md §4.C13): background worker that turns
//! stale `historique/` sessions into `persistante/` summaries, feeds the
//! training dataset, and checkpoints progress so a crash never re-runs
//! or skips a session.

pub mod dataset;
pub mod grouping;
pub mod state;
pub mod summarizer;

use dataset::{passes_quality_gate, truncate_content, DatasetGate, DatasetRecord};
use grouping::{group_unprocessed_sessions, SessionGroup};
use mnemos_config::PathRegistry;
use mnemos_core::prelude::{Intent, Interaction, InteractionMeta, MnemosError};
use mnemos_llm::CompletionClient;
use mnemos_memory::MemoryManager;
use serde_json::{Map, Value};
use state::ConsolidatorState;
use std::collections::HashMap;
use std::sync::Arc;
use summarizer::{build_consolidation_prompt, parse_summary_blocks, truncate_at_terminator, SummaryBlock};

/// Runs the full deferred-consolidation pipeline (spec.md §4.C13).
pub struct ConsolidatorWorker {
    paths: PathRegistry,
    memory: Arc<MemoryManager>,
    client: Arc<dyn CompletionClient>,
    timeout_hours: f64,
}

/// One round's outcome, surfaced for logging and tests.
#[derive(Debug, Default, Clone)]
pub struct ConsolidationReport {
    pub sessions_processed: usize,
    pub summaries_written: usize,
    pub dataset_records_written: usize,
}

impl ConsolidatorWorker {
    #[must_use]
    pub fn new(paths: PathRegistry, memory: Arc<MemoryManager>, client: Arc<dyn CompletionClient>, timeout_hours: f64) -> Self {
        Self { paths, memory, client, timeout_hours }
    }

    /// One consolidation pass: group unprocessed sessions, summarise every
    /// session that has gone quiet longer than `timeout_hours`, and
    /// checkpoint the result (spec.md §4.C13 steps 1-2).
    pub async fn run_once(&self) -> Result<ConsolidationReport, MnemosError> {
        let mut state = ConsolidatorState::load(&self.paths.traitement_state());
        let groups = group_unprocessed_sessions(&self.paths.historique(), &state.processed_filenames);
        tracing::debug!(agent = "consolidator", candidate_sessions = groups.len(), "deferred consolidation pass starting");
        let mut dataset_gate = DatasetGate::seeded_from(&self.paths.batch_dataset());
        let mut report = ConsolidationReport::default();

        for group in groups {
            let Some(last_timestamp) = group.last_timestamp() else { continue };
            let hours_quiet = chrono::Utc::now().signed_duration_since(last_timestamp).num_minutes() as f64 / 60.0;
            if hours_quiet <= self.timeout_hours {
                continue;
            }

            if let Err(e) = self.consolidate_session(&group, &mut dataset_gate, &mut report).await {
                tracing::warn!(agent = "consolidator", session_id = %group.session_id, error = %e, "failed to consolidate session");
                return Err(e);
            }
            for turn in &group.turns {
                state.processed_filenames.insert(turn.filename.clone());
            }
            report.sessions_processed += 1;
        }

        state.last_run = Some(chrono::Utc::now());
        state.persist(&self.paths.traitement_state())?;
        tracing::info!(
            agent = "consolidator",
            sessions = report.sessions_processed,
            summaries = report.summaries_written,
            dataset_records = report.dataset_records_written,
            "deferred consolidation pass finished"
        );
        Ok(report)
    }

    /// Summarises one session: prompt, stream-and-truncate, parse,
    /// persist, vectorise, index, and feed the training dataset (spec.md
    /// §4.C13 step 2).
    async fn consolidate_session(&self, group: &SessionGroup, dataset_gate: &mut DatasetGate, report: &mut ConsolidationReport) -> Result<(), MnemosError> {
        let prompt = build_consolidation_prompt(group);
        let raw = self.client.generate(&prompt).await.unwrap_or_default();
        let truncated = truncate_at_terminator(&raw);
        let blocks = parse_summary_blocks(truncated);

        for (block, turn) in blocks.iter().zip(group.turns.iter()) {
            self.persist_summary_block(block, &turn.interaction.prompt, turn.interaction.meta.message_turn, &group.session_id)?;
            report.summaries_written += 1;

            let intent = Intent::new(&turn.interaction.prompt, block.subject, block.action, block.category);
            if passes_quality_gate(&turn.interaction.prompt, &intent) {
                let record = DatasetRecord {
                    prompt: truncate_content(&turn.interaction.prompt),
                    subject: block.subject.to_string(),
                    action: block.action.to_string(),
                    category: block.category.to_string(),
                    summary: truncate_content(&block.summary),
                };
                if dataset_gate.consider_and_append(&self.paths.batch_dataset(), &record)? {
                    report.dataset_records_written += 1;
                }
            }
        }
        Ok(())
    }

    /// Assembles the consolidated `Interaction` for one parsed block,
    /// persists it under `persistante/`, vectorises it into the
    /// narrative store, and upserts it into the inverted index (spec.md
    /// §4.C13 step 2).
    fn persist_summary_block(&self, block: &SummaryBlock, original_prompt: &str, message_turn: u64, session_id: &str) -> Result<(), MnemosError> {
        let now = chrono::Utc::now();
        let mut free_data = HashMap::new();
        free_data.insert("source".to_string(), Value::String("consolidation_global".to_string()));

        let interaction = Interaction {
            prompt: original_prompt.to_string(),
            response: block.summary.clone(),
            system: String::new(),
            intent: Intent::new(original_prompt, block.subject, block.action, block.category),
            memory_context: Vec::new(),
            meta: InteractionMeta {
                id: uuid::Uuid::new_v4().to_string(),
                session_id: session_id.to_string(),
                message_turn,
                timestamp: now,
                source_agent: "DeferredConsolidator".to_string(),
                kind: "batch_summary".to_string(),
                files_consulted: Vec::new(),
                judge_valid: true,
                quality_score: 1.0,
                details: String::new(),
                len_content: block.summary.chars().count(),
                free_data,
            },
        };

        let suffix = &uuid::Uuid::new_v4().simple().to_string()[..4];
        let filename = format!(
            "{}_{}_{}_{}_{suffix}.json",
            block.subject.to_string().to_uppercase(),
            block.action.to_string().to_uppercase(),
            block.category.to_string().to_uppercase(),
            now.format("%Y%m%d_%H%M%S"),
        );
        std::fs::create_dir_all(self.paths.persistante())?;
        std::fs::write(self.paths.persistante().join(&filename), serde_json::to_string_pretty(&interaction)?)?;

        let mut meta = Map::new();
        meta.insert("kind".to_string(), Value::String("batch_summary".to_string()));
        meta.insert("session_id".to_string(), Value::String(session_id.to_string()));
        meta.insert("message_turn".to_string(), Value::Number(message_turn.into()));
        meta.insert("path".to_string(), Value::String(format!("persistante/{filename}")));
        let key = format!("{session_id}_{message_turn}_summary");
        self.memory.vectoriser().vectorise_narrative(&key, &block.summary, meta)?;

        let fields = mnemos_fulltext::DocumentFields {
            path: format!("persistante/{filename}"),
            filename,
            content: block.summary.clone(),
            kind: "batch_summary".to_string(),
            timestamp: now.to_rfc3339(),
            subject_tag: block.subject.to_string(),
            action_tag: block.action.to_string(),
            category_tag: block.category.to_string(),
            session_id: session_id.to_string(),
            message_turn: message_turn as i64,
        };
        self.memory.index().update(fields)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mnemos_config::PathRegistry;
    use mnemos_core::prelude::*;
    use mnemos_fulltext::InvertedIndex;
    use mnemos_llm::TokenStream;
    use mnemos_memory::vectoriser::DualVectoriser;
    use mnemos_vectorstore::encoder::HashingEncoder;
    use mnemos_vectorstore::store::StoreKind;
    use mnemos_vectorstore::VectorStore;
    use std::collections::HashMap as StdHashMap;

    struct StubClient(String);

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn generate(&self, _prompt: &str) -> Result<String, MnemosError> {
            Ok(self.0.clone())
        }
        async fn stream(&self, _prompt: &str) -> Result<TokenStream, MnemosError> {
            unimplemented!("not exercised by these tests")
        }
        async fn health_check(&self) -> Result<(), MnemosError> {
            Ok(())
        }
        fn name(&self) -> &str {
            "stub"
        }
    }

    fn worker(tmp: &std::path::Path, response: &str, timeout_hours: f64) -> ConsolidatorWorker {
        let paths = PathRegistry::new(tmp);
        let narrative = Arc::new(VectorStore::open(&tmp.join("vectorielle"), StoreKind::Narrative, Arc::new(HashingEncoder)).unwrap());
        let legislative = Arc::new(VectorStore::open(&tmp.join("regles/vecteurs"), StoreKind::Legislative, Arc::new(HashingEncoder)).unwrap());
        let vectoriser = DualVectoriser::new(narrative, legislative);
        let index = InvertedIndex::open_in_memory().unwrap();
        let memory = Arc::new(MemoryManager::new(paths.clone(), vectoriser, index));
        ConsolidatorWorker::new(paths, memory, Arc::new(StubClient(response.to_string())), timeout_hours)
    }

    fn turn(session_id: &str, turn_n: u64, prompt: &str, hours_ago: i64) -> Interaction {
        Interaction {
            prompt: prompt.to_string(),
            response: "ok".to_string(),
            system: String::new(),
            intent: Intent::new(prompt, SubjectEnum::Code, ActionEnum::Unknown, CategoryEnum::General),
            memory_context: Vec::new(),
            meta: InteractionMeta {
                id: format!("id-{turn_n}"),
                session_id: session_id.to_string(),
                message_turn: turn_n,
                timestamp: chrono::Utc::now() - chrono::Duration::hours(hours_ago),
                source_agent: "orchestrator".to_string(),
                kind: "turn".to_string(),
                files_consulted: Vec::new(),
                judge_valid: true,
                quality_score: 1.0,
                details: String::new(),
                len_content: prompt.len(),
                free_data: StdHashMap::new(),
            },
        }
    }

    #[tokio::test]
    async fn stale_session_is_consolidated_and_checkpointed() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = PathRegistry::new(tmp.path());
        std::fs::create_dir_all(paths.historique()).unwrap();
        std::fs::write(paths.historique().join("t1.json"), serde_json::to_string(&turn("s1", 1, "please explain the retrieval agent module", 3)).unwrap()).unwrap();

        let response = "=== MSG 1 ===\n{\"subject\": \"code\", \"action\": \"explain\", \"category\": \"code\", \"summary\": \"explained the retrieval agent\"}\n=== END OF SESSION ===";
        let worker = worker(tmp.path(), response, 2.0);
        let report = worker.run_once().await.unwrap();

        assert_eq!(report.sessions_processed, 1);
        assert_eq!(report.summaries_written, 1);
        assert_eq!(report.dataset_records_written, 1);

        let persisted: Vec<_> = std::fs::read_dir(paths.persistante()).unwrap().collect();
        assert_eq!(persisted.len(), 1);
        assert_eq!(worker.memory.vectoriser().narrative().len(), 1);
        assert_eq!(worker.memory.index().len().unwrap(), 1);

        let state = ConsolidatorState::load(&paths.traitement_state());
        assert!(state.processed_filenames.contains("t1.json"));
        assert!(state.last_run.is_some());
    }

    #[tokio::test]
    async fn fresh_session_is_left_unprocessed() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = PathRegistry::new(tmp.path());
        std::fs::create_dir_all(paths.historique()).unwrap();
        std::fs::write(paths.historique().join("t1.json"), serde_json::to_string(&turn("s1", 1, "please explain this", 0)).unwrap()).unwrap();

        let worker = worker(tmp.path(), "=== MSG 1 ===\n{}\n=== END OF SESSION ===", 2.0);
        let report = worker.run_once().await.unwrap();
        assert_eq!(report.sessions_processed, 0);
    }

    #[tokio::test]
    async fn low_quality_prompt_is_summarised_but_not_added_to_dataset() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = PathRegistry::new(tmp.path());
        std::fs::create_dir_all(paths.historique()).unwrap();
        std::fs::write(paths.historique().join("t1.json"), serde_json::to_string(&turn("s1", 1, "exit now", 3)).unwrap()).unwrap();

        let response = "=== MSG 1 ===\n{\"subject\": \"code\", \"action\": \"explain\", \"category\": \"code\", \"summary\": \"user left\"}\n=== END OF SESSION ===";
        let worker = worker(tmp.path(), response, 2.0);
        let report = worker.run_once().await.unwrap();

        assert_eq!(report.summaries_written, 1);
        assert_eq!(report.dataset_records_written, 0);
        assert!(!paths.batch_dataset().is_file());
    }
}
