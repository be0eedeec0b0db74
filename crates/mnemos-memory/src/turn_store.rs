//! L1 transactional per-turn JSON (spec.md §4.C5, §6):
//! `historique/interaction_{subject}_{action}_{category}_{ts}.json`,
//! atomically written (write to a sibling temp file, then rename — a
//! reader never observes a partially-written file).

use mnemos_config::PathRegistry;
use mnemos_core::prelude::{Interaction, MnemosError};

/// Writes `interaction` atomically under `historique/`. Returns the
/// filename (not the full path) so the caller can index it elsewhere.
pub fn write_turn(paths: &PathRegistry, interaction: &Interaction) -> Result<String, MnemosError> {
    std::fs::create_dir_all(paths.historique())?;
    let timestamp = interaction.meta.timestamp.format("%Y%m%d%H%M%S%3f");
    let filename = format!("interaction_{}_{timestamp}.json", interaction.classification_path_fragment().to_lowercase());
    let final_path = paths.historique().join(&filename);
    let tmp_path = paths.historique().join(format!(".{filename}.tmp"));

    let serialized = serde_json::to_string_pretty(interaction)?;
    std::fs::write(&tmp_path, serialized)?;
    std::fs::rename(&tmp_path, &final_path)?;
    Ok(filename)
}

/// Reads a turn back (spec.md §8: "Persist -> read-back" round-trip).
pub fn read_turn(paths: &PathRegistry, filename: &str) -> Result<Interaction, MnemosError> {
    let raw = std::fs::read_to_string(paths.historique().join(filename))?;
    serde_json::from_str(&raw).map_err(MnemosError::from)
}

/// Lists the newest `n` filenames under `historique/`, newest first
/// (spec.md §4.C6 "Chronological history").
pub fn newest_turns(paths: &PathRegistry, n: usize) -> Result<Vec<String>, MnemosError> {
    let dir = paths.historique();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut entries: Vec<(std::time::SystemTime, String)> = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let modified = entry.metadata()?.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        entries.push((modified, name));
    }
    entries.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(entries.into_iter().take(n).map(|(_, name)| name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemos_core::prelude::*;
    use std::collections::HashMap;

    fn sample_interaction() -> Interaction {
        Interaction {
            prompt: "hi".to_string(),
            response: "hello".to_string(),
            system: "sys".to_string(),
            intent: Intent::new("hi", SubjectEnum::Code, ActionEnum::Explain, CategoryEnum::General),
            memory_context: Vec::new(),
            meta: InteractionMeta {
                id: "id-1".to_string(),
                session_id: "s1".to_string(),
                message_turn: 1,
                timestamp: chrono::Utc::now(),
                source_agent: "orchestrator".to_string(),
                kind: "turn".to_string(),
                files_consulted: Vec::new(),
                judge_valid: true,
                quality_score: 0.8,
                details: String::new(),
                len_content: 5,
                free_data: HashMap::new(),
            },
        }
    }

    #[test]
    fn write_then_read_back_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = PathRegistry::new(tmp.path());
        let interaction = sample_interaction();
        let filename = write_turn(&paths, &interaction).unwrap();
        assert!(filename.starts_with("interaction_code_explain_general_"));

        let read_back = read_turn(&paths, &filename).unwrap();
        assert_eq!(read_back.prompt, interaction.prompt);
        assert_eq!(read_back.response, interaction.response);
    }

    #[test]
    fn no_tmp_file_left_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = PathRegistry::new(tmp.path());
        write_turn(&paths, &sample_interaction()).unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(paths.historique())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn newest_turns_returns_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = PathRegistry::new(tmp.path());
        let mut first = sample_interaction();
        first.meta.message_turn = 1;
        write_turn(&paths, &first).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let mut second = sample_interaction();
        second.meta.message_turn = 2;
        second.meta.timestamp = chrono::Utc::now() + chrono::Duration::seconds(1);
        write_turn(&paths, &second).unwrap();

        let newest = newest_turns(&paths, 1).unwrap();
        assert_eq!(newest.len(), 1);
    }
}
