//! `record_feedback_extended` (spec.md §4.C12 step 7): persists a
//! feedback JSON file and conditionally upserts it into the inverted
//! index.

use chrono::Utc;
use mnemos_config::PathRegistry;
use mnemos_core::prelude::MnemosError;
use mnemos_fulltext::{DocumentFields, InvertedIndex};
use serde_json::json;

/// Writes `reflexive/feedback/feedback_{+1|-1}_{keyword}_{ts}.json`; if
/// `keyword` matches `trigger_keyword` and `score` is positive, the file
/// is also upserted into the inverted index so the keyword can be
/// recalled lexically at the next turn (spec.md §4.C12 step 7).
pub fn record_feedback_extended(
    paths: &PathRegistry,
    index: &InvertedIndex,
    prompt: &str,
    response: &str,
    score: i32,
    keyword: &str,
    trigger_keyword: &str,
) -> Result<(), MnemosError> {
    let dir = paths.reflexive_feedback();
    std::fs::create_dir_all(&dir)?;

    let sign = if score >= 0 { "+1" } else { "-1" };
    let slug = if keyword.trim().is_empty() { "none".to_string() } else { keyword.trim().to_lowercase().replace(' ', "_") };
    let timestamp = Utc::now();
    let filename = format!("feedback_{sign}_{slug}_{}.json", timestamp.format("%Y%m%d_%H%M%S"));

    let body = json!({
        "prompt": prompt,
        "response": response,
        "score": score,
        "keyword": keyword,
        "timestamp": timestamp.to_rfc3339(),
    });
    std::fs::write(dir.join(&filename), serde_json::to_string_pretty(&body)?)?;

    if !keyword.trim().is_empty() && keyword.trim().eq_ignore_ascii_case(trigger_keyword) && score > 0 {
        let fields = DocumentFields {
            path: dir.join(&filename).to_string_lossy().to_string(),
            filename,
            content: format!("{prompt}\n{response}"),
            kind: "feedback".to_string(),
            timestamp: timestamp.to_rfc3339(),
            subject_tag: String::new(),
            action_tag: String::new(),
            category_tag: keyword.to_string(),
            session_id: String::new(),
            message_turn: 0,
        };
        index.update(fields)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(tmp: &std::path::Path) -> (PathRegistry, InvertedIndex) {
        let paths = PathRegistry::new(tmp);
        let index = InvertedIndex::open_in_memory().unwrap();
        (paths, index)
    }

    #[test]
    fn feedback_file_is_written_under_reflexive_feedback() {
        let tmp = tempfile::tempdir().unwrap();
        let (paths, index) = env(tmp.path());
        record_feedback_extended(&paths, &index, "good answer", "thanks", 1, "clarity", "clarity").unwrap();

        let files: Vec<_> = std::fs::read_dir(paths.reflexive_feedback()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(index.len().unwrap(), 1);
    }

    #[test]
    fn non_trigger_keyword_skips_index_upsert() {
        let tmp = tempfile::tempdir().unwrap();
        let (paths, index) = env(tmp.path());
        record_feedback_extended(&paths, &index, "bad answer", "oops", -1, "other", "clarity").unwrap();
        assert_eq!(index.len().unwrap(), 0);
    }

    #[test]
    fn negative_score_skips_index_upsert_even_on_trigger_keyword() {
        let tmp = tempfile::tempdir().unwrap();
        let (paths, index) = env(tmp.path());
        record_feedback_extended(&paths, &index, "bad answer", "oops", -1, "clarity", "clarity").unwrap();
        assert_eq!(index.len().unwrap(), 0);
    }
}
