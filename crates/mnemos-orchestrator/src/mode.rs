//! Mode selection (spec.md §4.C11 step 7): an exhaustive if/else chain
//! choosing which [`PromptRequest`] variant a turn builds, in priority
//! order.

use mnemos_core::prelude::{Atom, CategoryEnum, CodeChunk, Intent};

/// Everything mode selection needs to know about the current turn, kept
/// separate from `SessionState` so it can be constructed fresh per turn
/// without borrowing the whole session.
pub struct ModeInputs<'a> {
    pub prompt: &'a str,
    pub intent: &'a Intent,
    pub manual_code: Option<&'a str>,
    pub cartography_atom: Option<&'a Atom>,
    pub file_atom: Option<&'a Atom>,
    pub code_chunks: &'a [CodeChunk],
}

/// One of the non-tool-loop prompt shapes a turn can resolve to before
/// the context/rules/readmes/memories/history sections are filled in by
/// the caller (the concrete [`mnemos_core::prelude::PromptRequest`] is
/// assembled by `turn.rs` once the mode is known, since several modes
/// need the same retrieved sections).
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    ManualContextCode,
    Cartography,
    FileInspection,
    StagingReview,
    StandardCode,
    Standard,
}

/// Runs the step-7 selection (spec.md §4.C11): manual context first,
/// then cartography, then file inspection, then staging review, then
/// code-aware vs. plain standard.
#[must_use]
pub fn select(inputs: &ModeInputs<'_>) -> Mode {
    if inputs.manual_code.is_some() {
        return Mode::ManualContextCode;
    }
    if inputs.cartography_atom.is_some() {
        return Mode::Cartography;
    }
    if let Some(atom) = inputs.file_atom {
        let kind = atom.fields().kind.as_str();
        if matches!(kind, "technical_file" | "raw_file") && matches!(inputs.intent.category, CategoryEnum::Analyse | CategoryEnum::Code | CategoryEnum::Agent) {
            return Mode::FileInspection;
        }
    }
    if matches!(inputs.intent.category, CategoryEnum::Plan) && inputs.prompt.to_lowercase().contains("staging") {
        return Mode::StagingReview;
    }
    if !inputs.code_chunks.is_empty() {
        return Mode::StandardCode;
    }
    Mode::Standard
}
