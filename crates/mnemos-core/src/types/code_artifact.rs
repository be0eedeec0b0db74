//! `CodeArtifact` (spec.md §3, §4.C5).

use serde::{Deserialize, Serialize};

/// A single parsed function or method signature recovered by the static
/// analyser, used inside [`CodeAnalysis`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedSignature {
    pub name: String,
    pub signature: String,
    pub docstring: Option<String>,
    pub args: Vec<String>,
    pub return_type: Option<String>,
}

/// Structured parse result attached to a [`CodeArtifact`]
/// (spec.md §3 `CodeArtifact.analysis`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeAnalysis {
    pub mode: String,
    pub functions: Vec<ParsedSignature>,
    pub classes: Vec<String>,
    pub imports: Vec<String>,
    pub docstring: Option<String>,
    pub errors: Vec<String>,
    pub extras: serde_json::Value,
}

/// A code block extracted from a response and archived to disk
/// (spec.md §3 `CodeArtifact`, §4.C5 `save_code_artifacts`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub id: String,
    pub hash: String,
    pub language: String,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub analysis: CodeAnalysis,
    pub kind: String,
}
