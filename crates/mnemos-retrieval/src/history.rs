//! Chronological history (spec.md §4.C6): newest `m` turns from
//! `historique/`, each swapped for its consolidated summary when one
//! exists, returned in chronological (oldest-first) order.

use crate::vector_memory::find_consolidated_summary;
use mnemos_core::prelude::{Atom, Interaction};
use mnemos_memory::newest_turns;
use mnemos_config::PathRegistry;
use std::path::Path;

fn load_turn(paths: &PathRegistry, filename: &str) -> Option<Interaction> {
    let raw = std::fs::read_to_string(paths.historique().join(filename)).ok()?;
    serde_json::from_str(&raw).ok()
}

/// Spec.md §4.C6 "Chronological history": list the newest `m` files,
/// swap each for its consolidated summary when available, reverse to
/// chronological order, return as atoms.
#[must_use]
pub fn chronological_history(paths: &PathRegistry, m: usize) -> Vec<Atom> {
    let Ok(filenames) = newest_turns(paths, m) else { return Vec::new() };
    let persistante_dir: &Path = &paths.persistante();

    let mut atoms: Vec<Atom> = filenames
        .into_iter()
        .filter_map(|filename| {
            let interaction = load_turn(paths, &filename)?;
            let swapped = find_consolidated_summary(persistante_dir, &interaction.meta.session_id, interaction.meta.message_turn as i64);
            let (title, content, kind) = match swapped {
                Some((summary_title, summary_content)) => (summary_title, summary_content, "consolidated_summary".to_string()),
                None => (filename, format!("{}\n{}", interaction.prompt, interaction.response), "raw_history".to_string()),
            };
            Some(Atom::memory(content, title, kind, 1.0))
        })
        .collect();

    atoms.reverse();
    atoms
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemos_core::prelude::*;
    use mnemos_memory::write_turn;
    use std::collections::HashMap;

    fn interaction(turn: u64) -> Interaction {
        Interaction {
            prompt: format!("prompt {turn}"),
            response: format!("response {turn}"),
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
        }
    }

    #[test]
    fn history_is_returned_oldest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = PathRegistry::new(tmp.path());
        write_turn(&paths, &interaction(1)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        write_turn(&paths, &interaction(2)).unwrap();

        let atoms = chronological_history(&paths, 10);
        assert_eq!(atoms.len(), 2);
        assert!(atoms[0].content().contains("prompt 1"));
        assert!(atoms[1].content().contains("prompt 2"));
    }
}
