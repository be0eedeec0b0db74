//! `SessionState` (spec.md §4.C11, §5): the orchestrator's only mutable
//! cross-turn state. One instance per running conversation; the turn
//! loop is the sole writer.

use mnemos_core::prelude::{ExecutionPlan, Intent};
use std::collections::HashSet;

/// Everything the turn loop carries from one turn to the next. Never
/// shared outside the orchestrator thread (spec.md §5 "shared
/// resources": "the session history buffer ... mutated only from the
/// orchestrator thread").
pub struct SessionState {
    pub session_id: String,
    pub message_turn: u64,
    pub last_intent: Option<Intent>,
    pub active_plan: Option<ExecutionPlan>,
    /// Files pinned into context across turns by a prior `lire_fichier`/
    /// `read_file` tool call (spec.md §4.C11 step 6 "active-file
    /// injection").
    pub active_files: HashSet<String>,
    /// Set by an `!!!` alert turn, consumed by the very next turn's
    /// retrieval step (spec.md §4.C11 step 4: "if the active alert-
    /// protocol override is set, prepend it as a top-priority rule").
    pub pending_alert_rule: Option<String>,
    /// Normalized URLs already scraped by a web-research call earlier
    /// in this session (SPEC_FULL.md "Web research scrape
    /// de-duplication"), so a later `web_search` tool call or forced
    /// web turn doesn't re-fetch the same page.
    pub visited_urls: HashSet<String>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            message_turn: 0,
            last_intent: None,
            active_plan: None,
            active_files: HashSet::new(),
            pending_alert_rule: None,
            visited_urls: HashSet::new(),
        }
    }

    /// Monotonically advances `message_turn` (spec.md §5 "ordering
    /// guarantees": "`message_turn` is monotonically increasing per
    /// `session_id`"). Called once per completed turn.
    pub fn next_turn(&mut self) -> u64 {
        self.message_turn += 1;
        self.message_turn
    }

    pub fn pin_file(&mut self, filename: impl Into<String>) {
        self.active_files.insert(filename.into());
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_counter_starts_at_one_after_first_advance() {
        let mut session = SessionState::new();
        assert_eq!(session.message_turn, 0);
        assert_eq!(session.next_turn(), 1);
        assert_eq!(session.next_turn(), 2);
    }

    #[test]
    fn each_session_gets_a_distinct_id() {
        let a = SessionState::new();
        let b = SessionState::new();
        assert_ne!(a.session_id, b.session_id);
    }
}
