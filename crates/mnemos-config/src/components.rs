//! Per-component configuration shapes (spec.md §6: "one YAML per
//! component, each with a `configuration:` root"). Field names mirror the
//! recognised keys spec.md lists so the YAML on disk is self-documenting.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Orchestrator session policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSessionConfig {
    pub max_history_session: usize,
    pub relevance_threshold: f64,
    pub max_items_context: usize,
    pub tags_priority: Vec<String>,
}

impl Default for OrchestratorSessionConfig {
    fn default() -> Self {
        Self {
            max_history_session: 20,
            relevance_threshold: 0.35,
            max_items_context: 12,
            tags_priority: vec!["rule".to_string(), "memory".to_string()],
        }
    }
}

/// Judge scoring and decision thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub pertinence: PertinenceConfig,
    pub decision: DecisionConfig,
    pub limites: JudgeLimitesConfig,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self { pertinence: PertinenceConfig::default(), decision: DecisionConfig::default(), limites: JudgeLimitesConfig::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PertinenceConfig {
    pub stop_words: Vec<String>,
    pub boost_titre: f64,
    pub bonus_sujet: f64,
}

impl Default for PertinenceConfig {
    fn default() -> Self {
        Self {
            stop_words: ["le", "la", "les", "de", "des", "un", "une", "et", "the", "a", "an", "of", "and"]
                .into_iter()
                .map(String::from)
                .collect(),
            boost_titre: 1.5,
            bonus_sujet: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub seuil_validation: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self { seuil_validation: 0.6 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeLimitesConfig {
    pub min_chars_contexte: usize,
    pub max_chars_contexte: usize,
    pub marge_prompt_total: usize,
}

impl Default for JudgeLimitesConfig {
    fn default() -> Self {
        Self { min_chars_contexte: 40, max_chars_contexte: 4000, marge_prompt_total: 8000 }
    }
}

/// Retrieval agent limits and scoring knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub memoire: MemoireConfig,
    pub limites: RetrievalLimitesConfig,
    pub scoring: ScoringConfig,
    pub everything_exe_path: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            memoire: MemoireConfig::default(),
            limites: RetrievalLimitesConfig::default(),
            scoring: ScoringConfig::default(),
            everything_exe_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoireConfig {
    pub type_memoire: String,
}

impl Default for MemoireConfig {
    fn default() -> Self {
        Self { type_memoire: "narrative".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalLimitesConfig {
    pub recherche_everything_max: usize,
    pub resultats_finaux: usize,
    pub historique_recent: usize,
}

impl Default for RetrievalLimitesConfig {
    fn default() -> Self {
        Self { recherche_everything_max: 50, resultats_finaux: 8, historique_recent: 6 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub boost_intention: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { boost_intention: 0.15 }
    }
}

/// Context agent aggregation rules (symbolic/category/semantic/truth).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Lower-cased prompt regex -> rule IDs to retrieve verbatim.
    pub symbolic_rules_map: HashMap<String, Vec<String>>,
    /// Rule tag -> regex that triggers retrieving all rules under that tag.
    pub triggers_categories: HashMap<String, String>,
    pub semantic_rules_top_k: usize,
    pub default_rule_title: String,
    pub default_rule_content: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            symbolic_rules_map: HashMap::new(),
            triggers_categories: HashMap::new(),
            semantic_rules_top_k: 3,
            default_rule_title: "R_DEFAULT_BASE".to_string(),
            default_rule_content: "Respond truthfully, cite sources from context, and defer to project conventions.".to_string(),
        }
    }
}

/// Prompt builder asset paths (spec.md §4.C9: `{user_profile}`,
/// `{system_summary}`, `{tool_instructions}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub user_profile_path: String,
    pub system_summary_path: String,
    /// Missing this file is fatal (spec.md §4.C9) — no default content.
    pub tool_instructions_path: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            user_profile_path: "connaissances/user_profile.md".to_string(),
            system_summary_path: "connaissances/system_summary.md".to_string(),
            tool_instructions_path: "connaissances/tool_instructions.md".to_string(),
        }
    }
}

/// Deferred consolidator inactivity policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidatorConfig {
    pub processeur_persistante: ProcesseurPersistanteConfig,
}

impl Default for ConsolidatorConfig {
    fn default() -> Self {
        Self { processeur_persistante: ProcesseurPersistanteConfig::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcesseurPersistanteConfig {
    pub timeout_session_heures: f64,
}

impl Default for ProcesseurPersistanteConfig {
    fn default() -> Self {
        Self { timeout_session_heures: 2.0 }
    }
}

/// Orchestrator turn-loop and deep-web-research policy (spec.md §4.C11).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Bounds the tool-call state machine (spec.md §8 invariant 8).
    pub max_autonomy_steps: usize,
    /// Markdown file injected verbatim when the `!!!` alert protocol fires.
    pub alert_protocol_path: String,
    /// Path (relative to the memory root) of the generated cold-start summary.
    pub system_summary_path: String,
    /// Lines read from the agent's history/todo markdown to seed a fresh summary.
    pub system_summary_seed_lines: usize,
    /// Hours after which the deferred consolidator's last run counts as stale.
    pub consolidator_stale_after_hours: i64,
    /// Path (relative to the memory root) of the flat project-map document
    /// `read_cartography` reads.
    pub cartography_path: String,
    /// `+1`/`-1` feedback only upserts a correction rule into the inverted
    /// index when its keyword matches this one (spec.md §4.C12).
    pub feedback_trigger_keyword: String,
    pub web_research: WebResearchConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_autonomy_steps: 6,
            alert_protocol_path: "connaissances/alert_protocol.md".to_string(),
            system_summary_path: "connaissances/system_summary.md".to_string(),
            system_summary_seed_lines: 5,
            consolidator_stale_after_hours: 45,
            cartography_path: "connaissances/project_map.json".to_string(),
            feedback_trigger_keyword: "clarity".to_string(),
            web_research: WebResearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebResearchConfig {
    pub max_queries: usize,
    pub max_tours: usize,
    pub per_page_timeout_secs: u64,
    pub max_content_len: usize,
    pub sufficiency_threshold: f64,
    pub search_endpoint: Option<String>,
}

impl Default for WebResearchConfig {
    fn default() -> Self {
        Self {
            max_queries: 3,
            max_tours: 3,
            per_page_timeout_secs: 10,
            max_content_len: 4000,
            sufficiency_threshold: 7.0,
            search_endpoint: None,
        }
    }
}

/// Code subsystem scan/index/RAG policy (spec.md §4.C10).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeConfig {
    /// Directory the project graph is built from, relative to the memory root's
    /// sibling project checkout (or absolute).
    pub project_root: String,
    /// Sub-paths under `project_root` to scan; empty means scan the whole root.
    pub scan_roots: Vec<String>,
    /// Library names that trigger `consult_external_docs` when mentioned in a question.
    pub critical_libraries: Vec<String>,
    /// Base URL of a local documentation server queried by `consult_external_docs`.
    pub external_docs_url: Option<String>,
    /// File-watcher debounce window before a batch of changes retriggers indexing.
    pub watch_debounce_ms: u64,
    /// Characters a single chunk's embedded text is truncated to.
    pub chunk_max_chars: usize,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            project_root: ".".to_string(),
            scan_roots: Vec::new(),
            critical_libraries: vec!["torch".to_string(), "numpy".to_string(), "pandas".to_string()],
            external_docs_url: None,
            watch_debounce_ms: 500,
            chunk_max_chars: 4000,
        }
    }
}

/// LLM client server/generation profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub active_profile: String,
    pub models: HashMap<String, ModelConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let mut models = HashMap::new();
        models.insert("large".to_string(), ModelConfig { server_url: "http://127.0.0.1:8080".to_string(), generation: GenerationConfig::default() });
        models.insert("small".to_string(), ModelConfig { server_url: "http://127.0.0.1:8081".to_string(), generation: GenerationConfig::default() });
        Self { active_profile: "large".to_string(), models }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub server_url: String,
    pub generation: GenerationConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { server_url: "http://127.0.0.1:8080".to_string(), generation: GenerationConfig::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub stop_tokens: Vec<String>,
    pub cache_prompt: bool,
    pub do_sample: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
            top_p: 0.9,
            stop_tokens: vec!["</s>".to_string()],
            cache_prompt: true,
            do_sample: true,
        }
    }
}
