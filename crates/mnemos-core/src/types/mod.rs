//! Core semantic types shared across the workspace (spec.md §3).

pub mod architecture;
pub mod atom;
pub mod code_artifact;
pub mod intent;
pub mod interaction;
pub mod judge;
pub mod plan;
pub mod prompt;
pub mod retrieval;

pub use architecture::{CallEdge, ClassInfo, MethodInfo, ModuleInfo, ProjectArchitecture};
pub use atom::{Atom, AtomFields, CodeChunk, CodeChunkKind, CodeContext, TechDoc, RULE_DEFAULT_SCORE};
pub use code_artifact::{CodeAnalysis, CodeArtifact, ParsedSignature};
pub use intent::{fold_accents, ActionEnum, CategoryEnum, Intent, SubjectEnum};
pub use interaction::{Interaction, InteractionMeta};
pub use judge::JudgeVerdict;
pub use plan::ExecutionPlan;
pub use prompt::{ExecutionPlanRef, PromptRequest};
pub use retrieval::{ContextResult, Memory, RetrievalResult};
