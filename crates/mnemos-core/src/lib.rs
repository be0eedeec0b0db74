//! Shared types, error kind, and cross-cutting utilities for the mnemos
//! cognitive runtime workspace.

pub mod error;
pub mod json_extract;
pub mod stats;
pub mod telemetry;
pub mod types;

pub use error::{MnemosError, Result};

/// Re-exports the names most crates in the workspace pull in together,
/// mirroring `llmspell-memory::prelude`'s convention.
pub mod prelude {
    pub use crate::error::{MnemosError, Result};
    pub use crate::json_extract::{extract_json_block, extract_json_object, repair_trailing_comma};
    pub use crate::stats::{AgentStats, StatsSnapshot};
    pub use crate::types::{
        fold_accents, Atom, AtomFields, CallEdge, ClassInfo, CodeAnalysis, CodeArtifact, CodeChunk, CodeChunkKind,
        CodeContext, ContextResult, ExecutionPlan, ExecutionPlanRef, Intent, Interaction, InteractionMeta,
        JudgeVerdict, Memory, MethodInfo, ModuleInfo, ParsedSignature, ProjectArchitecture, PromptRequest,
        RetrievalResult, TechDoc, ActionEnum, CategoryEnum, SubjectEnum, RULE_DEFAULT_SCORE,
    };
}
