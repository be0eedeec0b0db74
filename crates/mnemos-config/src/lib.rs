//! Per-component YAML configuration and the on-disk path registry
//! (spec.md §6, SPEC_FULL.md ambient stack + "Auditor path registry"
//! supplement).

pub mod components;
pub mod loader;
pub mod paths;

pub use components::{
    CodeConfig, ConsolidatorConfig, ContextConfig, DecisionConfig, GenerationConfig, JudgeConfig, JudgeLimitesConfig,
    LlmConfig, MemoireConfig, ModelConfig, OrchestratorConfig, OrchestratorSessionConfig, PertinenceConfig,
    ProcesseurPersistanteConfig, PromptConfig, RetrievalConfig, RetrievalLimitesConfig, ScoringConfig, WebResearchConfig,
};
pub use loader::load_component;
pub use paths::PathRegistry;
