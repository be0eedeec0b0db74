//! Error types and handling for the mnemos cognitive runtime.
//!
//! Every crate in the workspace defines its own narrow error enum and
//! converts it into [`MnemosError`] at the boundary it crosses into a
//! caller that doesn't care about the specific subsystem. Components that
//! are specified as fail-open (the Judge, the LLM client, web research)
//! never return one of these for a soft failure — they return a neutral
//! `Ok` value instead. `MnemosError` is reserved for conditions spec.md §7
//! classifies as "Missing critical asset" or "Index inconsistency".

use thiserror::Error;

/// Comprehensive error enum for all mnemos operations that are not
/// handled by a component-local fail-open policy.
#[derive(Debug, Error)]
pub enum MnemosError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("missing critical asset: {message}")]
    MissingCriticalAsset { message: String },

    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("index corruption: {message}")]
    IndexCorruption { message: String },

    #[error("llm provider error: {message}")]
    Provider { message: String },

    #[error("schema validation error: {message}")]
    Schema { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl MnemosError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn missing_critical_asset(message: impl Into<String>) -> Self {
        Self::MissingCriticalAsset { message: message.into() }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into() }
    }

    pub fn index_corruption(message: impl Into<String>) -> Self {
        Self::IndexCorruption { message: message.into() }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider { message: message.into() }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MnemosError>;
