//! Session summarisation prompt/response handling (spec.md §4.C13
//! step 2): build the concatenated prompt, stop generation at the
//! session terminator, and split the response into per-message JSON
//! blocks.

use crate::grouping::SessionGroup;
use mnemos_core::json_extract::extract_json_object;
use mnemos_core::prelude::{ActionEnum, CategoryEnum, SubjectEnum};

const MSG_DELIMITER_PREFIX: &str = "=== MSG";
const SESSION_TERMINATOR: &str = "=== END OF SESSION ===";

/// One parsed `{subject, action, category, summary}` block.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryBlock {
    pub subject: SubjectEnum,
    pub action: ActionEnum,
    pub category: CategoryEnum,
    pub summary: String,
}

/// Concatenates every turn in the group, numbered and tagged `User` /
/// `Assistant`, followed by the systemic instruction that demands one
/// JSON block per message plus the delimiters (spec.md §4.C13 step 2).
#[must_use]
pub fn build_consolidation_prompt(group: &SessionGroup) -> String {
    let mut body = String::new();
    for (i, turn) in group.turns.iter().enumerate() {
        let n = i + 1;
        body.push_str(&format!("=== MSG {n} ===\nUser: {}\nAssistant: {}\n", turn.interaction.prompt, turn.interaction.response));
    }
    format!(
        "{body}\nFor each numbered message above, emit exactly one JSON block \
         {{\"subject\": string, \"action\": string, \"category\": string, \"summary\": string}} \
         immediately preceded by its own \"=== MSG n ===\" delimiter. After the last \
         message's block, emit the line \"{SESSION_TERMINATOR}\" and stop."
    )
}

/// Returns the prefix of `text` up to and including the first
/// occurrence of the session terminator, or the whole text if the
/// terminator never appears (spec.md §4.C13 step 2: "stream the
/// generation; stop immediately upon seeing the terminator").
#[must_use]
pub fn truncate_at_terminator(text: &str) -> &str {
    match text.find(SESSION_TERMINATOR) {
        Some(idx) => &text[..idx + SESSION_TERMINATOR.len()],
        None => text,
    }
}

/// Splits a (possibly terminator-truncated) response on the `=== MSG`
/// delimiter and parses each segment's JSON block, normalising
/// classification strings via the existing lenient enum mappers
/// (spec.md §4.C13 step 2: "normalise classification strings to enum
/// members (exact → case-insensitive → default)").
#[must_use]
pub fn parse_summary_blocks(text: &str) -> Vec<SummaryBlock> {
    let truncated = truncate_at_terminator(text);
    truncated
        .split(MSG_DELIMITER_PREFIX)
        .skip(1)
        .filter_map(|segment| {
            let parsed = extract_json_object(segment);
            if parsed.is_empty() {
                return None;
            }
            let field = |key: &str| parsed.get(key).and_then(|v| v.as_str()).unwrap_or_default().to_string();
            Some(SummaryBlock {
                subject: SubjectEnum::from_text(&field("subject")),
                action: ActionEnum::from_text(&field("action")),
                category: CategoryEnum::from_text(&field("category")),
                summary: field("summary"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_stops_exactly_at_terminator() {
        let text = format!("=== MSG 1 ===\n{{\"subject\":\"code\"}}\n{SESSION_TERMINATOR}\ntrailing garbage the model kept generating");
        let truncated = truncate_at_terminator(&text);
        assert!(truncated.ends_with(SESSION_TERMINATOR));
        assert!(!truncated.contains("trailing garbage"));
    }

    #[test]
    fn truncate_returns_whole_text_when_terminator_missing() {
        let text = "=== MSG 1 ===\n{\"subject\":\"code\"}";
        assert_eq!(truncate_at_terminator(text), text);
    }

    #[test]
    fn parse_summary_blocks_splits_and_normalises_classification() {
        let text = format!(
            "=== MSG 1 ===\n{{\"subject\": \"Code\", \"action\": \"Fix\", \"category\": \"Code\", \"summary\": \"fixed a bug\"}}\n\
             === MSG 2 ===\n{{\"subject\": \"memory\", \"action\": \"search\", \"category\": \"general\", \"summary\": \"looked up a rule\"}}\n\
             {SESSION_TERMINATOR}"
        );
        let blocks = parse_summary_blocks(&text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].subject, SubjectEnum::Code);
        assert_eq!(blocks[0].action, ActionEnum::Fix);
        assert_eq!(blocks[0].summary, "fixed a bug");
        assert_eq!(blocks[1].subject, SubjectEnum::Memory);
    }

    #[test]
    fn unparseable_segment_is_skipped_not_fatal() {
        let text = format!("=== MSG 1 ===\nnot json at all\n{SESSION_TERMINATOR}");
        assert!(parse_summary_blocks(&text).is_empty());
    }
}
