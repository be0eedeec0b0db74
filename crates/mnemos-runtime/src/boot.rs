//! Boot sequence: load every component's YAML config, open the two
//! vector stores and the inverted index, and wire the thirteen agents
//! into one `Orchestrator` (spec.md §4.C11 "process wiring"), grounded
//! on `llmspell-kernel`'s boot conventions (one assembly function,
//! config loaded before any agent is constructed, fatal errors on a
//! missing critical asset per spec.md §7).

use mnemos_code::CodeSubsystem;
use mnemos_config::components::{
    CodeConfig, ConsolidatorConfig, ContextConfig, JudgeConfig, LlmConfig, OrchestratorConfig, OrchestratorSessionConfig, PromptConfig, RetrievalConfig,
};
use mnemos_config::{load_component, PathRegistry};
use mnemos_context::ContextAgent;
use mnemos_core::MnemosError;
use mnemos_fulltext::InvertedIndex;
use mnemos_llm::{CompletionClient, HttpCompletionClient, SerializedClient};
use mnemos_memory::{DualVectoriser, MemoryManager};
use mnemos_orchestrator::{Orchestrator, OrchestratorDeps};
use mnemos_reflexor::Reflexor;
use mnemos_retrieval::RetrievalAgent;
use mnemos_vectorstore::{HashingEncoder, StoreKind, VectorStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Every config and open handle `main` needs after boot, beyond the
/// `Orchestrator` itself — background workers read these directly
/// instead of re-deriving them from the orchestrator's private state.
pub struct Runtime {
    pub orchestrator: Arc<Orchestrator>,
    pub memory: Arc<MemoryManager>,
    pub retrieval: Arc<RetrievalAgent>,
    pub code: Arc<CodeSubsystem>,
    pub paths: PathRegistry,
    pub project_root: std::path::PathBuf,
    pub code_config: CodeConfig,
    pub consolidator_config: ConsolidatorConfig,
    pub orchestrator_config: OrchestratorConfig,
    pub small_client: Arc<dyn CompletionClient>,
}

/// Assembles every agent from config and opens all on-disk stores.
/// Fails only on a "missing critical asset" per spec.md §7 (an
/// inference server being unreachable is checked separately, at the
/// first health probe, not here — a cold server must not block boot).
pub async fn assemble(memory_root: &Path, config_dir: &Path, project_root: &Path) -> Result<Runtime, MnemosError> {
    let paths = PathRegistry::new(memory_root);
    paths.ensure_dirs()?;

    let retrieval_config: RetrievalConfig = load_component(config_dir, "retrieval")?;
    let judge_config: JudgeConfig = load_component(config_dir, "judge")?;
    let context_config: ContextConfig = load_component(config_dir, "context")?;
    let session_config: OrchestratorSessionConfig = load_component(config_dir, "orchestrator_session")?;
    let orchestrator_config: OrchestratorConfig = load_component(config_dir, "orchestrator")?;
    let prompt_config: PromptConfig = load_component(config_dir, "prompt")?;
    let llm_config: LlmConfig = load_component(config_dir, "llm")?;
    let consolidator_config: ConsolidatorConfig = load_component(config_dir, "consolidator")?;
    let code_config: CodeConfig = load_component(config_dir, "code")?;

    // spec.md §4.C9: the tool-instructions markdown is a required asset —
    // missing it is fatal (§7 "Missing critical asset"), checked here so
    // the process refuses to start rather than failing mid-turn.
    let tool_instructions = memory_root.join(&prompt_config.tool_instructions_path);
    if !tool_instructions.is_file() {
        return Err(MnemosError::missing_critical_asset(format!(
            "tool_instructions markdown not found at {}",
            tool_instructions.display()
        )));
    }

    let encoder = Arc::new(HashingEncoder);
    let narrative = Arc::new(VectorStore::open(&paths.vectorielle(), StoreKind::Narrative, encoder.clone())?);
    let legislative = Arc::new(VectorStore::open(&paths.regles_vecteurs(), StoreKind::Legislative, encoder)?);

    // Two independent connections onto the same SQLite file: the memory
    // manager's writer connection and the retrieval agent's reader
    // connection (spec.md §5: "read by many callers and written only
    // through C5" — each agent owns the connection it needs, SQLite's
    // own locking arbitrates the rest).
    let index_path = paths.root().join("fulltext.sqlite3");
    let writer_index = InvertedIndex::open(&index_path)?;
    let reader_index = InvertedIndex::open(&index_path)?;

    let vectoriser = DualVectoriser::new(Arc::clone(&narrative), Arc::clone(&legislative));
    let memory = Arc::new(MemoryManager::new(paths.clone(), vectoriser, writer_index));

    let retrieval = Arc::new(RetrievalAgent::new(paths.clone(), Arc::clone(&narrative), Arc::clone(&legislative), reader_index, retrieval_config));
    let context = Arc::new(ContextAgent::new(Arc::clone(&retrieval), context_config, session_config, judge_config.pertinence.clone()));

    let code = Arc::new(CodeSubsystem::open(&paths.code(), code_config.clone())?);

    let large_client: Arc<dyn CompletionClient> = Arc::new(build_model_client("large", &llm_config));
    let small_raw = build_model_client("small", &llm_config);
    // spec.md §4.C1: "serialises calls with a process-wide mutex so a
    // classification and a judge call cannot race on the shared backend."
    let small_client: Arc<dyn CompletionClient> = Arc::new(SerializedClient::new(small_raw));

    let reflexor = Arc::new(Reflexor::new(Arc::clone(&small_client), Arc::clone(&memory), Arc::clone(&narrative), 5));

    let web_search: Arc<dyn mnemos_orchestrator::web_research::WebSearchClient> =
        Arc::new(mnemos_orchestrator::web_research::HttpWebSearchClient::new(orchestrator_config.web_research.search_endpoint.clone()));

    let http = reqwest::Client::builder().timeout(Duration::from_secs(30)).build().map_err(|e| MnemosError::configuration(format!("building http client: {e}")))?;

    let deps = OrchestratorDeps {
        paths: paths.clone(),
        retrieval: Arc::clone(&retrieval),
        context,
        memory: Arc::clone(&memory),
        code: Arc::clone(&code),
        reflexor,
        large_client,
        small_client: Arc::clone(&small_client),
        web_search,
        http,
        prompt_config,
        orchestrator_config: orchestrator_config.clone(),
        judge_config,
    };
    let orchestrator = Arc::new(Orchestrator::new(deps));

    Ok(Runtime {
        orchestrator,
        memory,
        retrieval,
        code,
        paths,
        project_root: project_root.to_path_buf(),
        code_config,
        consolidator_config,
        orchestrator_config,
        small_client,
    })
}

fn build_model_client(profile: &str, config: &LlmConfig) -> HttpCompletionClient {
    let model = config.models.get(profile).cloned().unwrap_or_default();
    HttpCompletionClient::new(profile, model.server_url, model.generation)
}
