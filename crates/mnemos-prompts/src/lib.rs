//! Prompt builder (spec.md §4.C9): ChatML template dispatch over every
//! `PromptRequest` variant, with field-usage tracking and section
//! formatters shared across variants.

pub mod builder;
pub mod chatml;
pub mod field_tracker;
pub mod sections;

pub use builder::{build, build_first_chat_prompt};
