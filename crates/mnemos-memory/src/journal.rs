//! L0 raw journal — write-ahead log (spec.md §4.C5): "one JSONL file per
//! calendar day under `brute/`. Each write is flushed and `fsynced`
//! before return." This is the source of truth; every other layer can
//! be rebuilt from it.

use chrono::Utc;
use mnemos_config::PathRegistry;
use mnemos_core::MnemosError;
use std::fs::OpenOptions;
use std::io::Write;

/// A single L0 line. Either a full interaction (serialised by the
/// caller) or the lighter `{role, content, session_id, message_turn,
/// metadata, timestamp}` shape spec.md §4.C5 allows for non-interaction
/// writes (e.g. a tool result that never becomes a full turn).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum JournalLine {
    Raw(serde_json::Value),
    RoleContent {
        role: String,
        content: String,
        session_id: String,
        message_turn: u64,
        metadata: serde_json::Value,
        timestamp: chrono::DateTime<Utc>,
    },
}

/// Appends one line to today's `brute/interactions_YYYY-MM-DD.jsonl`,
/// flushing and fsyncing before returning (spec.md §4.C5, §8 invariant 1).
pub fn append_journal_line(paths: &PathRegistry, line: &JournalLine) -> Result<(), MnemosError> {
    std::fs::create_dir_all(paths.brute())?;
    let filename = format!("interactions_{}.jsonl", Utc::now().format("%Y-%m-%d"));
    let path = paths.brute().join(filename);

    let serialized = serde_json::to_string(line)?;
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    writeln!(file, "{serialized}")?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;

    #[test]
    fn append_writes_one_line_per_call() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = PathRegistry::new(tmp.path());

        append_journal_line(&paths, &JournalLine::Raw(serde_json::json!({"prompt": "hi"}))).unwrap();
        append_journal_line(&paths, &JournalLine::Raw(serde_json::json!({"prompt": "again"}))).unwrap();

        let filename = format!("interactions_{}.jsonl", Utc::now().format("%Y-%m-%d"));
        let content = std::fs::read_to_string(paths.brute().join(filename)).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let _: serde_json::Value = serde_json::from_str(line).unwrap();
        }
    }

    #[test]
    fn role_content_line_serialises_flat() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = PathRegistry::new(tmp.path());
        append_journal_line(
            &paths,
            &JournalLine::RoleContent {
                role: "user".to_string(),
                content: "hello".to_string(),
                session_id: "s1".to_string(),
                message_turn: 1,
                metadata: serde_json::json!({}),
                timestamp: Utc::now(),
            },
        )
        .unwrap();

        let filename = format!("interactions_{}.jsonl", Utc::now().format("%Y-%m-%d"));
        let file = std::fs::File::open(paths.brute().join(filename)).unwrap();
        let line = std::io::BufReader::new(file).lines().next().unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["role"], "user");
    }
}
