//! Session grouping (spec.md §4.C13 step 1): walk `historique/*.json`,
//! skip already-processed filenames, group by `session_id`, and sort
//! each group chronologically.

use chrono::{DateTime, Utc};
use mnemos_core::prelude::Interaction;
use std::collections::HashMap;
use std::path::Path;

/// One `historique/` turn still awaiting consolidation.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub filename: String,
    pub interaction: Interaction,
}

/// All unconsolidated turns for one session, oldest first.
#[derive(Debug, Clone)]
pub struct SessionGroup {
    pub session_id: String,
    pub turns: Vec<PendingTurn>,
}

impl SessionGroup {
    #[must_use]
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.turns.iter().map(|t| t.interaction.meta.timestamp).max()
    }
}

/// Scans `historique_dir`, skips filenames already recorded as
/// processed, and groups the rest by `session_id` with each group
/// sorted chronologically by `meta.timestamp`.
#[must_use]
pub fn group_unprocessed_sessions(historique_dir: &Path, processed_filenames: &std::collections::HashSet<String>) -> Vec<SessionGroup> {
    let mut groups: HashMap<String, Vec<PendingTurn>> = HashMap::new();

    let Ok(entries) = std::fs::read_dir(historique_dir) else {
        return Vec::new();
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(filename) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if processed_filenames.contains(&filename) {
            continue;
        }
        let Ok(raw) = std::fs::read_to_string(&path) else {
            tracing::warn!(file = %filename, "could not read historique turn, skipping");
            continue;
        };
        let Ok(interaction) = serde_json::from_str::<Interaction>(&raw) else {
            tracing::warn!(file = %filename, "could not parse historique turn as Interaction, skipping");
            continue;
        };
        groups.entry(interaction.meta.session_id.clone()).or_default().push(PendingTurn { filename, interaction });
    }

    let mut result: Vec<SessionGroup> = groups
        .into_iter()
        .map(|(session_id, mut turns)| {
            turns.sort_by_key(|t| t.interaction.meta.timestamp);
            SessionGroup { session_id, turns }
        })
        .collect();
    result.sort_by_key(|g| g.session_id.clone());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemos_core::prelude::*;
    use std::collections::{HashMap as StdHashMap, HashSet};

    fn turn(session_id: &str, turn_n: u64, ts_offset_secs: i64) -> Interaction {
        Interaction {
            prompt: format!("turn {turn_n}"),
            response: "ok".to_string(),
            system: String::new(),
            intent: Intent::new("turn", SubjectEnum::Conversation, ActionEnum::Unknown, CategoryEnum::General),
            memory_context: Vec::new(),
            meta: InteractionMeta {
                id: format!("id-{turn_n}"),
                session_id: session_id.to_string(),
                message_turn: turn_n,
                timestamp: chrono::Utc::now() + chrono::Duration::seconds(ts_offset_secs),
                source_agent: "orchestrator".to_string(),
                kind: "turn".to_string(),
                files_consulted: Vec::new(),
                judge_valid: true,
                quality_score: 1.0,
                details: String::new(),
                len_content: 2,
                free_data: StdHashMap::new(),
            },
        }
    }

    #[test]
    fn groups_by_session_and_sorts_chronologically() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("t1.json"), serde_json::to_string(&turn("s1", 2, 10)).unwrap()).unwrap();
        std::fs::write(tmp.path().join("t2.json"), serde_json::to_string(&turn("s1", 1, 0)).unwrap()).unwrap();
        std::fs::write(tmp.path().join("t3.json"), serde_json::to_string(&turn("s2", 1, 0)).unwrap()).unwrap();

        let groups = group_unprocessed_sessions(tmp.path(), &HashSet::new());
        assert_eq!(groups.len(), 2);
        let s1 = groups.iter().find(|g| g.session_id == "s1").unwrap();
        assert_eq!(s1.turns[0].interaction.meta.message_turn, 1);
        assert_eq!(s1.turns[1].interaction.meta.message_turn, 2);
    }

    #[test]
    fn already_processed_filenames_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("t1.json"), serde_json::to_string(&turn("s1", 1, 0)).unwrap()).unwrap();
        let mut processed = HashSet::new();
        processed.insert("t1.json".to_string());

        let groups = group_unprocessed_sessions(tmp.path(), &processed);
        assert!(groups.is_empty());
    }
}
