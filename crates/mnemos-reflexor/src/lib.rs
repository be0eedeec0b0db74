//! Reflexor (spec.md §4.C12): the alert-triggered diagnosis loop,
//! reflexive journal, corrective-rule generation, and extended
//! feedback recording.

pub mod diagnosis;
pub mod feedback;

pub use diagnosis::{Ecart, ReflexiveJournalEntry, Reflexor};
pub use feedback::record_feedback_extended;
