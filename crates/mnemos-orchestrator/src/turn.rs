//! The turn loop (spec.md §4.C11): command gate, forced web search,
//! intent detection, retrieval, code/active-file injection, mode
//! selection, tool-call-aware generation, the bounded tool loop, and
//! fire-and-forget post-processing, composed into one
//! `Orchestrator::think` entry point.

use crate::cartography;
use crate::code_extractor;
use crate::commands::{self, Command};
use crate::intent;
use crate::mode::{self, Mode, ModeInputs};
use crate::session::SessionState;
use crate::tools::{self, ToolCall};
use crate::web_research::{self, WebSearchClient};
use futures::StreamExt;
use mnemos_code::CodeSubsystem;
use mnemos_config::components::{JudgeConfig, OrchestratorConfig, PromptConfig};
use mnemos_config::PathRegistry;
use mnemos_context::ContextAgent;
use mnemos_core::prelude::{
    Atom, CodeChunk, CodeChunkKind, CodeContext, ContextResult, ExecutionPlan, ExecutionPlanRef, Intent, Interaction, InteractionMeta, Memory, PromptRequest,
};
use mnemos_judge::JudgeStats;
use mnemos_llm::CompletionClient;
use mnemos_memory::MemoryManager;
use mnemos_reflexor::{record_feedback_extended, Reflexor};
use mnemos_retrieval::RetrievalAgent;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex as AsyncMutex;

/// Emitted whenever the large model fails outright (spec.md §5
/// cancellation rules: "on exception the turn emits a fixed apology
/// string and continues post-processing").
const APOLOGY: &str = "I'm sorry, something went wrong while generating a response.";

static CODE_TRIGGER_EXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+\.(py|md|yaml|json)").expect("code-trigger regex is valid"));
const CODE_TRIGGER_KEYWORDS: [&str; 6] = ["code", "fonction", "classe", "script", "bug", "erreur"];
const NON_DURABLE_KINDS: [&str; 4] = ["technical_file", "raw_file", "code", "active_file"];

/// Which retrieval path a turn should take (spec.md §4.C11
/// `think(prompt, stream, search_mode, ...)`).
#[derive(Debug, Clone, Default)]
pub enum SearchMode {
    #[default]
    Normal,
    Web,
    ManualContext(String),
}

/// Receives live tokens during a streamed generation. The orchestrator
/// never assumes a particular transport — an HTTP SSE writer, a TUI
/// pane, or a test probe can all implement this.
pub trait StreamSink: Send + Sync {
    fn on_token(&self, token: &str);
}

/// Everything `Orchestrator::new` needs, gathered in one place so
/// `mnemos-runtime`'s boot sequence has a single struct to assemble and
/// hand over.
pub struct OrchestratorDeps {
    pub paths: PathRegistry,
    pub retrieval: Arc<RetrievalAgent>,
    pub context: Arc<ContextAgent>,
    pub memory: Arc<MemoryManager>,
    pub code: Arc<CodeSubsystem>,
    pub reflexor: Arc<Reflexor>,
    pub large_client: Arc<dyn CompletionClient>,
    pub small_client: Arc<dyn CompletionClient>,
    pub web_search: Arc<dyn WebSearchClient>,
    pub http: reqwest::Client,
    pub prompt_config: PromptConfig,
    pub orchestrator_config: OrchestratorConfig,
    pub judge_config: JudgeConfig,
}

/// One completed turn (post-processing has been dispatched, not
/// necessarily finished — spec.md §4.C11 step 10 is fire-and-forget).
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub response: String,
    pub steps_taken: usize,
    pub prompt_variant: String,
}

/// Outcome of dispatching one tool call, before it is turned into the
/// next turn's `PromptRequest` (spec.md §4.C11 step 9 routing table).
enum ToolOutcome {
    Cartography(Atom),
    FileInspection(Atom),
    Memories(Vec<Atom>),
    StagingReview(String),
    WebReport(String),
    Generic(String),
}

pub struct Orchestrator {
    paths: PathRegistry,
    retrieval: Arc<RetrievalAgent>,
    context: Arc<ContextAgent>,
    memory: Arc<MemoryManager>,
    code: Arc<CodeSubsystem>,
    reflexor: Arc<Reflexor>,
    large_client: Arc<dyn CompletionClient>,
    small_client: Arc<dyn CompletionClient>,
    web_search: Arc<dyn WebSearchClient>,
    http: reqwest::Client,
    prompt_config: PromptConfig,
    orchestrator_config: OrchestratorConfig,
    judge_config: JudgeConfig,
    judge_stats: Arc<JudgeStats>,
    session: AsyncMutex<SessionState>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(deps: OrchestratorDeps) -> Self {
        Self {
            paths: deps.paths,
            retrieval: deps.retrieval,
            context: deps.context,
            memory: deps.memory,
            code: deps.code,
            reflexor: deps.reflexor,
            large_client: deps.large_client,
            small_client: deps.small_client,
            web_search: deps.web_search,
            http: deps.http,
            prompt_config: deps.prompt_config,
            orchestrator_config: deps.orchestrator_config,
            judge_config: deps.judge_config,
            judge_stats: Arc::new(JudgeStats::new("coherence", 0.1)),
            session: AsyncMutex::new(SessionState::new()),
        }
    }

    #[must_use]
    pub fn session_id(&self) -> String {
        // Best-effort, non-blocking snapshot for logging; the session
        // lock is otherwise only ever held for the duration of a turn.
        self.session.try_lock().map(|s| s.session_id.clone()).unwrap_or_else(|_| "locked".to_string())
    }

    /// Runs one full turn (spec.md §4.C11). Holds the session lock for
    /// the whole turn — the turn loop is the sole writer and is
    /// strictly sequential per session (spec.md §5 ordering guarantees).
    pub async fn think(&self, prompt: &str, stream: bool, search_mode: SearchMode, sink: Option<&dyn StreamSink>) -> TurnOutcome {
        let mut session = self.session.lock().await;
        let is_first_turn = session.message_turn == 0;

        match commands::gate(prompt, is_first_turn) {
            Command::FirstChat => return self.handle_first_chat(prompt, stream, sink, &mut session).await,
            Command::Alert => return self.handle_alert(prompt, stream, sink, &mut session).await,
            Command::Feedback { score, keyword } => return self.handle_feedback(&keyword, score, &mut session).await,
            Command::Normal(trimmed) => self.handle_normal_turn(&trimmed, stream, search_mode, sink, &mut session).await,
        }
    }

    async fn handle_first_chat(&self, prompt: &str, stream: bool, sink: Option<&dyn StreamSink>, session: &mut SessionState) -> TurnOutcome {
        let system_summary = std::fs::read_to_string(self.paths.root().join(&self.prompt_config.system_summary_path)).unwrap_or_default();
        let history = self.context.history_snapshot();
        let full_prompt = match mnemos_prompts::build_first_chat_prompt(prompt, &system_summary, &history, self.paths.root(), &self.prompt_config) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "failed to build first-chat prompt");
                return self.finish_turn(prompt, APOLOGY.to_string(), "NewChat", 0, session);
            }
        };
        let (response, _) = self.generate_with_buffer(&full_prompt, stream, sink).await;
        self.finish_turn(prompt, response, "NewChat", 0, session)
    }

    async fn handle_alert(&self, prompt: &str, stream: bool, sink: Option<&dyn StreamSink>, session: &mut SessionState) -> TurnOutcome {
        let alert_protocol = std::fs::read_to_string(self.paths.root().join(&self.orchestrator_config.alert_protocol_path)).unwrap_or_default();
        let recent_history = self.context.history_snapshot();

        let reflexor = Arc::clone(&self.reflexor);
        let history_for_analysis = recent_history.clone();
        tokio::spawn(async move {
            if let Err(e) = reflexor.analyze(&history_for_analysis).await {
                tracing::warn!(error = %e, "reflexor analysis failed");
            }
        });

        let request = PromptRequest::Protocol { prompt: prompt.to_string(), alert_protocol: alert_protocol.clone(), recent_history };
        let full_prompt = match mnemos_prompts::build(&request, self.paths.root(), &self.prompt_config) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "failed to build protocol prompt");
                return self.finish_turn(prompt, APOLOGY.to_string(), "Protocol", 0, session);
            }
        };
        let (response, _) = self.generate_with_buffer(&full_prompt, stream, sink).await;

        // Prepend as a top-priority rule on the very next normal turn
        // (spec.md §4.C11 step 4).
        session.pending_alert_rule = Some(alert_protocol);
        self.finish_turn(prompt, response, "Protocol", 0, session)
    }

    async fn handle_feedback(&self, keyword: &str, score: i32, session: &mut SessionState) -> TurnOutcome {
        let (last_prompt, last_response) = self.context.last_exchange().unwrap_or_default();
        if let Err(e) = record_feedback_extended(&self.paths, self.memory.index(), &last_prompt, &last_response, score, keyword, &self.orchestrator_config.feedback_trigger_keyword) {
            tracing::warn!(error = %e, "failed to record feedback");
        }
        let ack = if score >= 0 { "Thanks for the feedback.".to_string() } else { "Noted — I'll try to do better.".to_string() };
        session.next_turn();
        TurnOutcome { response: ack, steps_taken: 0, prompt_variant: "Feedback".to_string() }
    }

    async fn handle_normal_turn(&self, prompt: &str, stream: bool, search_mode: SearchMode, sink: Option<&dyn StreamSink>, session: &mut SessionState) -> TurnOutcome {
        // Step 2: forced web search.
        if matches!(search_mode, SearchMode::Web) {
            let report = web_research::research_with_session_dedup(
                self.web_search.as_ref(),
                &self.http,
                &self.small_client,
                prompt,
                &self.orchestrator_config.web_research,
                Some(&mut session.visited_urls),
            )
            .await;
            let request = PromptRequest::WebSearch { prompt: prompt.to_string(), report_markdown: report.to_markdown() };
            let full_prompt = match mnemos_prompts::build(&request, self.paths.root(), &self.prompt_config) {
                Ok(p) => p,
                Err(e) => {
                    tracing::error!(error = %e, "failed to build web-search prompt");
                    return self.finish_turn(prompt, APOLOGY.to_string(), "WebSearch", 0, session);
                }
            };
            let (response, _) = self.generate_with_buffer(&full_prompt, stream, sink).await;
            return self.finish_turn(prompt, response, "WebSearch", 0, session);
        }

        // Step 3: intent detection.
        let detected_intent = intent::classify(&self.small_client, prompt).await;

        // Step 4: retrieval.
        let vector_result = self.retrieval.vector_context(prompt, &detected_intent);
        let mut context_result = self.context.build(prompt, &detected_intent, &vector_result);
        if let Some(alert_rule) = session.pending_alert_rule.take() {
            context_result.active_rules.insert(0, Atom::rule(alert_rule, "ALERT_PROTOCOL_OVERRIDE"));
        }

        // Step 5: code retrieval.
        let mut code_chunks: Vec<CodeChunk> = Vec::new();
        if mentions_code(prompt) {
            for hit in self.code.provide_context(prompt, 5) {
                code_chunks.push(code_context_to_chunk(&hit));
            }
        }

        // Step 6: active-file injection.
        for filename in session.active_files.clone() {
            if let Some(chunk) = read_active_file_chunk(&filename) {
                code_chunks.push(chunk);
            }
        }

        // Step 7: mode selection.
        let cartography_atom = find_atom_of_kind(&context_result.memory_context, "project_cartography");
        let file_atom = find_atom_of_kind(&context_result.memory_context, "technical_file").or_else(|| find_atom_of_kind(&context_result.memory_context, "raw_file"));
        let manual_code = match &search_mode {
            SearchMode::ManualContext(code) => Some(code.as_str()),
            _ => None,
        };
        let mode_inputs = ModeInputs {
            prompt,
            intent: &detected_intent,
            manual_code,
            cartography_atom: cartography_atom.as_ref(),
            file_atom: file_atom.as_ref(),
            code_chunks: &code_chunks,
        };
        let initial_mode = mode::select(&mode_inputs);

        let staged_summary = std::fs::read_to_string(self.paths.root().join(&self.orchestrator_config.system_summary_path)).unwrap_or_default();
        let initial_request = self.build_initial_request(initial_mode, prompt, &detected_intent, manual_code, cartography_atom, file_atom, &code_chunks, &context_result, staged_summary);

        // Step 8: build + generate, buffering tool-call JSON.
        let initial_prompt = match mnemos_prompts::build(&initial_request, self.paths.root(), &self.prompt_config) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "failed to build initial turn prompt");
                return self.finish_turn(prompt, APOLOGY.to_string(), initial_request.variant_name(), 0, session);
            }
        };
        let variant_name = initial_request.variant_name();
        let (first_response, suppressed) = self.generate_with_buffer(&initial_prompt, stream, sink).await;

        // Step 9: bounded tool loop.
        let (final_text, steps_taken) = self.run_tool_loop(prompt, &detected_intent, session, first_response).await;

        if stream && suppressed {
            if let Some(sink) = sink {
                sink.on_token(&final_text);
            }
        }

        // Step 10: post-processing, fire-and-forget.
        self.context.record_turn(prompt, &final_text);
        let message_turn = session.next_turn();
        let session_id = session.session_id.clone();
        self.spawn_post_processing(prompt.to_string(), final_text.clone(), detected_intent, context_result, session_id, message_turn);

        TurnOutcome { response: final_text, steps_taken, prompt_variant: variant_name.to_string() }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_initial_request(
        &self,
        mode: Mode,
        prompt: &str,
        intent: &Intent,
        manual_code: Option<&str>,
        cartography_atom: Option<Atom>,
        file_atom: Option<Atom>,
        code_chunks: &[CodeChunk],
        context_result: &ContextResult,
        staged_summary: String,
    ) -> PromptRequest {
        match mode {
            Mode::ManualContextCode => PromptRequest::ManualContextCode {
                prompt: prompt.to_string(),
                intent: intent.clone(),
                user_code: manual_code.unwrap_or_default().to_string(),
                rules: context_result.active_rules.clone(),
            },
            Mode::Cartography => PromptRequest::Cartography { prompt: prompt.to_string(), cartography: cartography_atom.expect("Cartography mode requires a cartography atom") },
            Mode::FileInspection => PromptRequest::FileInspection { prompt: prompt.to_string(), file_atom: file_atom.expect("FileInspection mode requires a file atom"), intent: intent.clone() },
            Mode::StagingReview => PromptRequest::StagingReview { prompt: prompt.to_string(), staged_summary },
            Mode::StandardCode => PromptRequest::StandardCode {
                prompt: prompt.to_string(),
                intent: intent.clone(),
                rules: context_result.active_rules.clone(),
                readmes: context_result.readmes.clone(),
                code_chunks: code_chunks.to_vec(),
                history: context_result.history.clone(),
            },
            Mode::Standard => PromptRequest::Standard {
                prompt: prompt.to_string(),
                intent: intent.clone(),
                rules: context_result.active_rules.clone(),
                readmes: context_result.readmes.clone(),
                memories: context_result.memory_context.clone(),
                history: context_result.history.clone(),
            },
        }
    }

    /// Spec.md §4.C11 step 9: extract a tool call, dispatch it, build
    /// the next prompt from its result, generate again; repeat until
    /// `final_answer`, the step cap, or no tool call is found.
    async fn run_tool_loop(&self, prompt: &str, intent: &Intent, session: &mut SessionState, first_response: String) -> (String, usize) {
        let mut current_response = first_response;
        let mut plan = session.active_plan.clone();
        let max_steps = self.orchestrator_config.max_autonomy_steps;

        for step in 1..=max_steps {
            let Some(round) = tools::parse(&current_response) else {
                return (current_response, step - 1);
            };
            if let Some(new_plan) = round.plan_update {
                plan = Some(new_plan);
                session.active_plan = plan.clone();
            }
            if let ToolCall::FinalAnswer { content } = round.call {
                return (content, step);
            }

            let outcome = self.dispatch_tool(round.call, intent, session).await;
            let next_request = self.build_next_request(prompt, intent, &plan, step, outcome);
            let next_prompt = match mnemos_prompts::build(&next_request, self.paths.root(), &self.prompt_config) {
                Ok(p) => p,
                Err(e) => {
                    tracing::error!(error = %e, "failed to build tool-loop prompt");
                    return (APOLOGY.to_string(), step);
                }
            };
            let (response, _) = self.generate_with_buffer(&next_prompt, false, None).await;
            current_response = response;
        }

        (current_response, max_steps)
    }

    async fn dispatch_tool(&self, call: ToolCall, intent: &Intent, session: &mut SessionState) -> ToolOutcome {
        match call {
            ToolCall::WebSearch { query } => {
                let report = web_research::research_with_session_dedup(
                    self.web_search.as_ref(),
                    &self.http,
                    &self.small_client,
                    &query,
                    &self.orchestrator_config.web_research,
                    Some(&mut session.visited_urls),
                )
                .await;
                ToolOutcome::WebReport(report.to_markdown())
            }
            ToolCall::MemorySearch { queries } => {
                if queries.iter().any(|q| mentions_cartography(q)) {
                    self.read_cartography_or_missing()
                } else {
                    let mut atoms: Vec<Atom> = Vec::new();
                    for query in &queries {
                        let result = self.retrieval.vector_context(query, intent);
                        atoms.extend(result.raw_memories.into_iter().map(Atom::Memory));
                    }
                    if atoms.is_empty() {
                        atoms.push(Atom::memory("No memory matched the search.", "NO_MEMORY_FOUND", "placeholder", 0.0));
                    }
                    ToolOutcome::Memories(atoms)
                }
            }
            ToolCall::ReadCartography => self.read_cartography_or_missing(),
            ToolCall::ReadFile { filename } => match self.retrieval.project_file_introspection(&filename).into_iter().next() {
                Some(hit) => {
                    let atom = Atom::memory(hit.content().to_string(), hit.title().to_string(), "technical_file", 1.0);
                    session.pin_file(hit.title().to_string());
                    ToolOutcome::FileInspection(atom)
                }
                None => ToolOutcome::Generic(format!("File '{filename}' could not be found.")),
            },
            ToolCall::UpdateSystemSummary { content } => {
                let path = self.paths.root().join(&self.orchestrator_config.system_summary_path);
                if let Some(parent) = path.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                if let Err(e) = append_line(&path, &content) {
                    tracing::warn!(error = %e, "failed to append to system summary");
                }
                let staged = std::fs::read_to_string(&path).unwrap_or(content);
                ToolOutcome::StagingReview(staged)
            }
            ToolCall::FinalAnswer { .. } => unreachable!("final_answer is handled before dispatch_tool"),
        }
    }

    fn read_cartography_or_missing(&self) -> ToolOutcome {
        match cartography::read_cartography(self.paths.root(), &self.orchestrator_config.cartography_path) {
            Some(atom) => ToolOutcome::Cartography(atom),
            None => ToolOutcome::Generic("No project cartography is available.".to_string()),
        }
    }

    fn build_next_request(&self, prompt: &str, intent: &Intent, plan: &Option<ExecutionPlan>, step: usize, outcome: ToolOutcome) -> PromptRequest {
        match outcome {
            ToolOutcome::Cartography(atom) => PromptRequest::Cartography { prompt: prompt.to_string(), cartography: atom },
            ToolOutcome::FileInspection(atom) => PromptRequest::FileInspection { prompt: prompt.to_string(), file_atom: atom, intent: intent.clone() },
            ToolOutcome::Memories(atoms) => self.build_memory_request(prompt, intent, plan, step, atoms),
            ToolOutcome::StagingReview(summary) => PromptRequest::StagingReview { prompt: prompt.to_string(), staged_summary: summary },
            ToolOutcome::WebReport(markdown) => PromptRequest::WebSearch { prompt: prompt.to_string(), report_markdown: markdown },
            ToolOutcome::Generic(text) => self.build_memory_request(prompt, intent, plan, step, vec![Atom::memory(text, "TOOL_RESULT", "tool_result", 1.0)]),
        }
    }

    fn build_memory_request(&self, prompt: &str, intent: &Intent, plan: &Option<ExecutionPlan>, step: usize, found_memories: Vec<Atom>) -> PromptRequest {
        if step == 1 {
            PromptRequest::MemorySearchFirst { prompt: prompt.to_string(), intent: intent.clone(), found_memories, plan: plan.as_ref().map(ExecutionPlan::as_ref_type) }
        } else {
            let plan_ref = plan.as_ref().map(ExecutionPlan::as_ref_type).unwrap_or_else(|| ExecutionPlanRef { global_objective: String::new(), steps: Vec::new() });
            PromptRequest::MemorySearch { prompt: prompt.to_string(), intent: intent.clone(), found_memories, plan: plan_ref }
        }
    }

    /// Generates from `prompt`, optionally streaming to `sink`. Buffers
    /// the first ~50 characters to detect a tool-call JSON response and
    /// suppress it from the live stream (spec.md §4.C11 step 8).
    /// Returns `(full_text, was_suppressed)`; intermediate tool-loop
    /// generations pass `stream=false` and skip the buffering dance
    /// entirely, since there is no live audience for them.
    async fn generate_with_buffer(&self, prompt: &str, stream: bool, sink: Option<&dyn StreamSink>) -> (String, bool) {
        let Some(sink) = sink.filter(|_| stream) else {
            let text = self.large_client.generate(prompt).await.unwrap_or_else(|_| APOLOGY.to_string());
            return (text, false);
        };

        let Ok(mut token_stream) = self.large_client.stream(prompt).await else {
            let text = self.large_client.generate(prompt).await.unwrap_or_else(|_| APOLOGY.to_string());
            return (text, false);
        };

        let mut buffer = String::new();
        let mut full = String::new();
        let mut decided = false;
        let mut suppress = false;

        while let Some(chunk) = token_stream.next().await {
            let Ok(token) = chunk else { break };
            full.push_str(&token);
            if !decided {
                buffer.push_str(&token);
                if buffer.chars().count() >= 50 {
                    suppress = looks_like_tool_call(&buffer);
                    decided = true;
                    if !suppress {
                        sink.on_token(&buffer);
                    }
                }
            } else if !suppress {
                sink.on_token(&token);
            }
        }

        if !decided {
            suppress = looks_like_tool_call(&buffer);
            if !suppress {
                sink.on_token(&buffer);
            }
        }

        (full, suppress)
    }

    fn finish_turn(&self, prompt: &str, response: String, variant: &str, steps_taken: usize, session: &mut SessionState) -> TurnOutcome {
        self.context.record_turn(prompt, &response);
        session.next_turn();
        TurnOutcome { response, steps_taken, prompt_variant: variant.to_string() }
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_post_processing(&self, prompt: String, response: String, intent: Intent, context_result: ContextResult, session_id: String, message_turn: u64) {
        let memory = Arc::clone(&self.memory);
        let small_client = Arc::clone(&self.small_client);
        let judge_stats = Arc::clone(&self.judge_stats);
        let judge_config = self.judge_config.clone();
        tokio::spawn(async move {
            post_process(memory, small_client, judge_stats, judge_config, prompt, response, intent, context_result, session_id, message_turn).await;
        });
    }
}

fn mentions_code(prompt: &str) -> bool {
    if CODE_TRIGGER_EXT.is_match(prompt) {
        return true;
    }
    let lower = prompt.to_lowercase();
    CODE_TRIGGER_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

fn mentions_cartography(query: &str) -> bool {
    let lower = query.to_lowercase();
    lower.contains("cartograph") || lower.contains("project_map")
}

fn looks_like_tool_call(buffer: &str) -> bool {
    let trimmed = buffer.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with("```json")
}

fn find_atom_of_kind(memories: &[Memory], kind: &str) -> Option<Atom> {
    memories.iter().find(|memory| memory.kind == kind).map(|memory| Atom::Memory(memory.clone()))
}

fn code_context_to_chunk(context: &CodeContext) -> CodeChunk {
    let kind = match context.kind.as_str() {
        "function" => CodeChunkKind::Function,
        "method" => CodeChunkKind::Method,
        "class" => CodeChunkKind::Class,
        "module" | "file" => CodeChunkKind::File,
        _ => CodeChunkKind::Snippet,
    };
    let content = if context.content.is_empty() { format!("{}\n{}", context.signature, context.docstring) } else { context.content.clone() };
    CodeChunk { content, path: context.module.clone(), kind, language: "python".to_string() }
}

fn read_active_file_chunk(filename: &str) -> Option<CodeChunk> {
    let content = std::fs::read_to_string(filename).ok()?;
    Some(CodeChunk { content, path: filename.to_string(), kind: CodeChunkKind::Active, language: "text".to_string() })
}

fn append_line(path: &std::path::Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "\n{content}")
}

/// The full post-turn pipeline (spec.md §4.C11 step 10): archive code
/// blocks, replace them in the stored response, compute the judge's
/// a-posteriori verdict, purge non-durable memory content, snapshot
/// rules/READMEs into `meta.free_data`, and persist the Interaction.
/// Runs as a detached task — nothing here can block the next turn.
#[allow(clippy::too_many_arguments)]
async fn post_process(
    memory: Arc<MemoryManager>,
    small_client: Arc<dyn CompletionClient>,
    judge_stats: Arc<JudgeStats>,
    judge_config: JudgeConfig,
    prompt: String,
    response: String,
    intent: Intent,
    mut context_result: ContextResult,
    session_id: String,
    message_turn: u64,
) {
    let blocks = code_extractor::find_blocks(&response);
    if !blocks.is_empty() {
        let artifacts = code_extractor::build_artifacts(&blocks);
        if let Err(e) = memory.save_code_artifacts(&code_extractor::default_extension_map(), artifacts) {
            tracing::warn!(error = %e, "failed to archive extracted code artifacts");
        }
    }
    let persisted_response = code_extractor::replace_blocks_with_placeholder(&response);
    let len_content = persisted_response.chars().count();

    let rag_context = context_result
        .memory_context
        .iter()
        .map(|m| m.content.clone())
        .chain(context_result.active_rules.iter().map(|a| a.content().to_string()))
        .collect::<Vec<_>>()
        .join("\n\n");
    let verdict = mnemos_judge::coherence(&small_client, &judge_stats, &rag_context, &prompt, &persisted_response, &judge_config.limites, judge_config.decision.seuil_validation).await;

    for memory_atom in &mut context_result.memory_context {
        if NON_DURABLE_KINDS.contains(&memory_atom.kind.as_str()) {
            memory_atom.content = "[file consulted — not persisted]".to_string();
        }
    }

    let mut free_data = HashMap::new();
    free_data.insert("rules".to_string(), serde_json::to_value(&context_result.active_rules).unwrap_or_default());
    free_data.insert("readmes".to_string(), serde_json::to_value(&context_result.readmes).unwrap_or_default());

    let interaction = Interaction {
        prompt,
        response: persisted_response,
        system: String::new(),
        intent,
        memory_context: context_result.memory_context.into_iter().map(Atom::Memory).collect(),
        meta: InteractionMeta {
            id: uuid::Uuid::new_v4().to_string(),
            session_id,
            message_turn,
            timestamp: chrono::Utc::now(),
            source_agent: "Orchestrator".to_string(),
            kind: "turn".to_string(),
            files_consulted: Vec::new(),
            judge_valid: verdict.valid,
            quality_score: verdict.score,
            details: verdict.reason,
            len_content,
            free_data,
        },
    };
    memory.persist_interaction(&interaction);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mnemos_config::components::{ContextConfig, JudgeConfig, OrchestratorSessionConfig, PertinenceConfig};
    use mnemos_config::PathRegistry;
    use mnemos_core::prelude::MnemosError;
    use mnemos_fulltext::InvertedIndex;
    use mnemos_llm::TokenStream;
    use mnemos_vectorstore::encoder::HashingEncoder;
    use mnemos_vectorstore::store::StoreKind;
    use mnemos_vectorstore::VectorStore;

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

    struct StubWebSearch;

    #[async_trait]
    impl WebSearchClient for StubWebSearch {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<String>, MnemosError> {
            Ok(Vec::new())
        }
    }

    fn write_prompt_assets(root: &std::path::Path, config: &PromptConfig) {
        std::fs::create_dir_all(root.join("connaissances")).unwrap();
        std::fs::write(root.join(&config.tool_instructions_path), "Use tools via JSON.").unwrap();
    }

    fn orchestrator(tmp: &std::path::Path, response: &str) -> Orchestrator {
        let paths = PathRegistry::new(tmp);
        paths.ensure_dirs().unwrap();
        let prompt_config = PromptConfig::default();
        write_prompt_assets(tmp, &prompt_config);

        let narrative = Arc::new(VectorStore::open(&paths.vectorielle(), StoreKind::Narrative, Arc::new(HashingEncoder)).unwrap());
        let legislative = Arc::new(VectorStore::open(&paths.regles_vecteurs(), StoreKind::Legislative, Arc::new(HashingEncoder)).unwrap());
        let index = InvertedIndex::open_in_memory().unwrap();
        let retrieval = Arc::new(RetrievalAgent::new(paths.clone(), Arc::clone(&narrative), legislative, index, mnemos_config::components::RetrievalConfig::default()));
        let context = Arc::new(ContextAgent::new(Arc::clone(&retrieval), ContextConfig::default(), OrchestratorSessionConfig::default(), PertinenceConfig::default()));

        let index2 = InvertedIndex::open_in_memory().unwrap();
        let vectoriser = mnemos_memory::vectoriser::DualVectoriser::new(narrative, Arc::new(VectorStore::open(&paths.regles_vecteurs(), StoreKind::Legislative, Arc::new(HashingEncoder)).unwrap()));
        let memory = Arc::new(MemoryManager::new(paths.clone(), vectoriser, index2));

        let code = Arc::new(CodeSubsystem::open(&tmp.join("code"), mnemos_config::CodeConfig::default()).unwrap());
        let client: Arc<dyn CompletionClient> = Arc::new(StubClient(response.to_string()));
        let reflexor = Arc::new(Reflexor::new(Arc::clone(&client), Arc::clone(&memory), memory.vectoriser().narrative().clone(), 3));

        let deps = OrchestratorDeps {
            paths,
            retrieval,
            context,
            memory,
            code,
            reflexor,
            large_client: Arc::clone(&client),
            small_client: client,
            web_search: Arc::new(StubWebSearch),
            http: reqwest::Client::new(),
            prompt_config,
            orchestrator_config: OrchestratorConfig::default(),
            judge_config: JudgeConfig::default(),
        };
        Orchestrator::new(deps)
    }

    #[tokio::test]
    async fn first_turn_salutation_goes_through_first_chat() {
        let tmp = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(tmp.path(), "Hello there, how can I help?");
        let outcome = orchestrator.think("hello", false, SearchMode::Normal, None).await;
        assert_eq!(outcome.prompt_variant, "NewChat");
        assert_eq!(outcome.response, "Hello there, how can I help?");
    }

    #[tokio::test]
    async fn alert_sets_pending_rule_for_the_next_turn() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("connaissances/alert_protocol.md"), "Never fabricate facts.").unwrap();
        let orchestrator = orchestrator(tmp.path(), r#"{"function": "final_answer", "arguments": {"content": "ok"}}"#);

        orchestrator.think("hi", false, SearchMode::Normal, None).await;
        orchestrator.think("this went badly !!!", false, SearchMode::Normal, None).await;

        let session = orchestrator.session.lock().await;
        assert_eq!(session.pending_alert_rule.as_deref(), Some("Never fabricate facts."));
    }

    #[tokio::test]
    async fn final_answer_terminates_the_tool_loop_immediately() {
        let tmp = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(tmp.path(), r#"{"function": "final_answer", "arguments": {"content": "the answer is 42"}}"#);
        orchestrator.think("hi", false, SearchMode::Normal, None).await;
        let outcome = orchestrator.think("explain the retry logic", false, SearchMode::Normal, None).await;
        assert_eq!(outcome.response, "the answer is 42");
        assert_eq!(outcome.steps_taken, 1);
    }

    #[tokio::test]
    async fn plain_prose_response_skips_the_tool_loop_entirely() {
        let tmp = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(tmp.path(), "Sure, here's a plain-language answer.");
        orchestrator.think("hi", false, SearchMode::Normal, None).await;
        let outcome = orchestrator.think("explain the retry logic", false, SearchMode::Normal, None).await;
        assert_eq!(outcome.response, "Sure, here's a plain-language answer.");
        assert_eq!(outcome.steps_taken, 0);
    }

    #[tokio::test]
    async fn step_cap_forces_a_fallback_response() {
        let tmp = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(tmp.path(), r#"{"function": "read_cartography", "arguments": {}}"#);
        orchestrator.think("hi", false, SearchMode::Normal, None).await;
        let outcome = orchestrator.think("explain the retry logic", false, SearchMode::Normal, None).await;
        assert_eq!(outcome.steps_taken, orchestrator.orchestrator_config.max_autonomy_steps);
    }

    #[tokio::test]
    async fn feedback_is_acknowledged_without_invoking_the_tool_loop() {
        let tmp = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(tmp.path(), "unused");
        orchestrator.think("hi", false, SearchMode::Normal, None).await;
        let outcome = orchestrator.think("+1 clarity", false, SearchMode::Normal, None).await;
        assert_eq!(outcome.prompt_variant, "Feedback");
        assert!(std::fs::read_dir(tmp.path().join("reflexive/feedback")).unwrap().count() >= 1);
    }
}
