//! In-memory, role-alternating session history ring buffer (spec.md
//! §4.C8 "Session history"), cold-started from the newest `historique/`
//! turns on boot.

use mnemos_config::PathRegistry;
use std::collections::VecDeque;

/// A capped ring buffer of `"user: ..."` / `"assistant: ..."` lines.
/// Role alternation is a convention of the caller (`push_turn` always
/// appends both halves of a turn together) rather than an invariant this
/// type enforces on its own.
pub struct SessionHistory {
    buffer: VecDeque<String>,
    cap: usize,
}

impl SessionHistory {
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self { buffer: VecDeque::with_capacity(cap), cap }
    }

    /// Cold-start seeding (spec.md §4.C8): reads the newest `cap / 2`
    /// turns from `historique/` (oldest first) and replays them as
    /// alternating user/assistant lines. Missing or malformed files are
    /// skipped — history seeding is best-effort.
    pub fn seed_cold_start(&mut self, paths: &PathRegistry) {
        let Ok(filenames) = mnemos_memory::newest_turns(paths, self.cap.div_ceil(2)) else { return };
        for filename in filenames.into_iter().rev() {
            let Ok(raw) = std::fs::read_to_string(paths.historique().join(&filename)) else { continue };
            let Ok(interaction) = serde_json::from_str::<mnemos_core::prelude::Interaction>(&raw) else { continue };
            self.push_turn(&interaction.prompt, &interaction.response);
        }
    }

    /// Appends one turn (`user` then `assistant`), evicting the oldest
    /// lines once the buffer exceeds its cap.
    pub fn push_turn(&mut self, prompt: &str, response: &str) {
        self.buffer.push_back(format!("user: {prompt}"));
        self.buffer.push_back(format!("assistant: {response}"));
        while self.buffer.len() > self.cap {
            self.buffer.pop_front();
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.buffer.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_turn_adds_both_roles_in_order() {
        let mut history = SessionHistory::new(10);
        history.push_turn("hi", "hello");
        assert_eq!(history.snapshot(), vec!["user: hi".to_string(), "assistant: hello".to_string()]);
    }

    #[test]
    fn buffer_evicts_oldest_lines_past_the_cap() {
        let mut history = SessionHistory::new(2);
        history.push_turn("one", "a");
        history.push_turn("two", "b");
        assert_eq!(history.snapshot(), vec!["user: two".to_string(), "assistant: b".to_string()]);
    }

    #[test]
    fn cold_start_seeds_from_historique_oldest_first() {
        use mnemos_core::prelude::*;
        use std::collections::HashMap;

        let tmp = tempfile::tempdir().unwrap();
        let paths = PathRegistry::new(tmp.path());
        let make = |turn: u64| Interaction {
            prompt: format!("p{turn}"),
            response: format!("r{turn}"),
            system: String::new(),
            intent: Intent::new("x", SubjectEnum::Unknown, ActionEnum::Unknown, CategoryEnum::Unknown),
            memory_context: Vec::new(),
            meta: InteractionMeta {
                id: format!("id-{turn}"),
                session_id: "s1".to_string(),
                message_turn: turn,
                timestamp: chrono::Utc::now() + chrono::Duration::seconds(turn as i64),
                source_agent: "x".to_string(),
                kind: "turn".to_string(),
                files_consulted: Vec::new(),
                judge_valid: true,
                quality_score: 0.9,
                details: String::new(),
                len_content: 0,
                free_data: HashMap::new(),
            },
        };
        mnemos_memory::write_turn(&paths, &make(1)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        mnemos_memory::write_turn(&paths, &make(2)).unwrap();

        let mut history = SessionHistory::new(10);
        history.seed_cold_start(&paths);
        let snapshot = history.snapshot();
        assert!(snapshot[0].contains("p1"));
        assert!(snapshot[2].contains("p2"));
    }
}
