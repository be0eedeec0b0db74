//! `PromptRequest`: tagged union of prompt-builder inputs (spec.md §3, §4.C9).

use super::atom::{Atom, CodeChunk};
use super::intent::Intent;
use super::retrieval::Memory;
use serde::{Deserialize, Serialize};

/// One variant per prompt mode. Each variant lists exactly the inputs
/// `mnemos-prompts::build` requires for that template — nothing more, so
/// the field-usage tracker (spec.md §4.C9) has a precise set to check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PromptRequest {
    Standard { prompt: String, intent: Intent, rules: Vec<Atom>, readmes: Vec<Atom>, memories: Vec<Memory>, history: Vec<String> },
    StandardCode { prompt: String, intent: Intent, rules: Vec<Atom>, readmes: Vec<Atom>, code_chunks: Vec<CodeChunk>, history: Vec<String> },
    ManualContextCode { prompt: String, intent: Intent, user_code: String, rules: Vec<Atom> },
    NewChat { system_summary: String, last_session_history: Vec<String> },
    MemorySearchFirst { prompt: String, intent: Intent, found_memories: Vec<Atom>, plan: Option<ExecutionPlanRef> },
    MemorySearch { prompt: String, intent: Intent, found_memories: Vec<Atom>, plan: ExecutionPlanRef },
    Cartography { prompt: String, cartography: Atom },
    FileInspection { prompt: String, file_atom: Atom, intent: Intent },
    StagingReview { prompt: String, staged_summary: String },
    WebSearch { prompt: String, report_markdown: String },
    Protocol { prompt: String, alert_protocol: String, recent_history: Vec<String> },
}

/// A lightweight reference to an [`super::plan::ExecutionPlan`] carried by
/// tool-loop prompt variants, avoiding a circular dependency between the
/// plan type and the prompt-request enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlanRef {
    pub global_objective: String,
    pub steps: Vec<String>,
}

impl PromptRequest {
    /// Name of the variant, used as the debug comment
    /// `#! PROMPT_TYPE: <VariantName>` (spec.md §4.C9).
    #[must_use]
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Standard { .. } => "Standard",
            Self::StandardCode { .. } => "StandardCode",
            Self::ManualContextCode { .. } => "ManualContextCode",
            Self::NewChat { .. } => "NewChat",
            Self::MemorySearchFirst { .. } => "MemorySearchFirst",
            Self::MemorySearch { .. } => "MemorySearch",
            Self::Cartography { .. } => "Cartography",
            Self::FileInspection { .. } => "FileInspection",
            Self::StagingReview { .. } => "StagingReview",
            Self::WebSearch { .. } => "WebSearch",
            Self::Protocol { .. } => "Protocol",
        }
    }
}
