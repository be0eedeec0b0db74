//! Vector memory with context swap and intent boost (spec.md §4.C6).

use mnemos_core::prelude::{Intent, Memory, RetrievalResult};
use mnemos_vectorstore::VectorStore;
use std::path::Path;

/// Looks for a consolidated summary under `persistante/` whose JSON body
/// contains `"session_id": "{session_id}"` and `"message_turn": {turn}`
/// (spec.md §4.C6: "a content-substring file search"). Returns the
/// summary's `(title, content)` pair if one is found.
#[must_use]
pub fn find_consolidated_summary(persistante_dir: &Path, session_id: &str, message_turn: i64) -> Option<(String, String)> {
    let entries = std::fs::read_dir(persistante_dir).ok()?;
    let session_needle = format!("\"session_id\": \"{session_id}\"");
    let turn_needle = format!("\"message_turn\": {message_turn}");
    for entry in entries.flatten() {
        let Ok(body) = std::fs::read_to_string(entry.path()) else { continue };
        if body.contains(&session_needle) && body.contains(&turn_needle) {
            let parsed: serde_json::Value = serde_json::from_str(&body).ok()?;
            let summary = parsed.get("response").and_then(|v| v.as_str())?.to_string();
            return Some((entry.file_name().to_string_lossy().to_string(), summary));
        }
    }
    None
}

/// Queries the narrative store for `k` hits, swaps any hit whose
/// metadata points into `historique/` and carries `session_id` +
/// `message_turn` for its consolidated summary when one exists, applies
/// the intent boost, sorts descending, and truncates to `n_final`
/// (spec.md §4.C6 "Vector memory with context swap and intent boost").
#[must_use]
pub fn retrieve_vector_context(narrative: &VectorStore, persistante_dir: &Path, query: &str, k: usize, intent: &Intent, boost_factor: f64, n_final: usize) -> RetrievalResult {
    let started = std::time::Instant::now();
    let Ok(hits) = narrative.search(query, k) else { return RetrievalResult::empty() };
    let scanned_count = hits.len();
    let boost_terms = intent.boost_terms();

    let mut memories: Vec<Memory> = hits
        .into_iter()
        .map(|hit| {
            let mut content = hit.meta.get("content").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let mut title = hit.meta.get("key").and_then(|v| v.as_str()).unwrap_or("memory").to_string();
            let mut kind = hit.meta.get("kind").and_then(|v| v.as_str()).unwrap_or("raw_history").to_string();

            let points_into_history = hit.meta.get("path").and_then(|v| v.as_str()).is_some_and(|p| p.contains("historique/"));
            if points_into_history {
                if let (Some(session_id), Some(message_turn)) = (
                    hit.meta.get("session_id").and_then(|v| v.as_str()),
                    hit.meta.get("message_turn").and_then(serde_json::Value::as_i64),
                ) {
                    if let Some((summary_title, summary_content)) = find_consolidated_summary(persistante_dir, session_id, message_turn) {
                        title = summary_title;
                        content = summary_content;
                        kind = "consolidated_summary".to_string();
                    }
                }
            }

            let matches = boost_terms.iter().filter(|term| title.to_lowercase().contains(term.as_str())).count();
            let score = f64::from(hit.score) * (1.0 + boost_factor * matches as f64);

            Memory { content, title, kind, score }
        })
        .collect();

    memories.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    memories.truncate(n_final);

    RetrievalResult { raw_memories: memories, scanned_count, elapsed_seconds: started.elapsed().as_secs_f64() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemos_core::prelude::{ActionEnum, CategoryEnum, SubjectEnum};
    use mnemos_vectorstore::encoder::HashingEncoder;
    use mnemos_vectorstore::store::StoreKind;
    use serde_json::Map;
    use std::sync::Arc;

    fn store(tmp: &Path) -> VectorStore {
        VectorStore::open(tmp, StoreKind::Narrative, Arc::new(HashingEncoder)).unwrap()
    }

    #[test]
    fn intent_boost_raises_matching_titles_above_nonmatching_ones() {
        let tmp = tempfile::tempdir().unwrap();
        let persistante = tmp.path().join("persistante");
        std::fs::create_dir_all(&persistante).unwrap();
        let store = store(&tmp.path().join("vecteurs"));

        let mut meta_a = Map::new();
        meta_a.insert("key".to_string(), "CODE_EXPLAIN_GENERAL".into());
        store.add_fragment("explain the function signature", meta_a, "a").unwrap();

        let mut meta_b = Map::new();
        meta_b.insert("key".to_string(), "MEMORY_SEARCH_GENERAL".into());
        store.add_fragment("explain the function signature", meta_b, "b").unwrap();

        let intent = Intent::new("explain the function", SubjectEnum::Code, ActionEnum::Explain, CategoryEnum::General);
        let result = retrieve_vector_context(&store, &persistante, "explain the function signature", 10, &intent, 0.5, 10);
        assert_eq!(result.raw_memories[0].title, "CODE_EXPLAIN_GENERAL");
    }

    #[test]
    fn context_swap_replaces_history_hit_with_consolidated_summary() {
        let tmp = tempfile::tempdir().unwrap();
        let persistante = tmp.path().join("persistante");
        std::fs::create_dir_all(&persistante).unwrap();
        std::fs::write(
            persistante.join("CODE_EXPLAIN_GENERAL_20260101_000000_abcd.json"),
            r#"{"response": "condensed summary text", "meta": {"session_id": "S", "message_turn": 3}}"#,
        )
        .unwrap();

        let store = store(&tmp.path().join("vecteurs"));
        let mut meta = Map::new();
        meta.insert("session_id".to_string(), "S".into());
        meta.insert("message_turn".to_string(), 3.into());
        meta.insert("path".to_string(), "historique/interaction_x.json".into());
        store.add_fragment("raw prompt\nraw response", meta, "k1").unwrap();

        let intent = Intent::new("anything", SubjectEnum::Unknown, ActionEnum::Unknown, CategoryEnum::Unknown);
        let result = retrieve_vector_context(&store, &persistante, "raw prompt", 10, &intent, 0.0, 10);
        assert_eq!(result.raw_memories[0].kind, "consolidated_summary");
        assert_eq!(result.raw_memories[0].content, "condensed summary text");
    }
}
