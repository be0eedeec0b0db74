//! Inverted-index targeted search (spec.md §4.C6): accepts a query and
//! an optional candidate-path whitelist; content preview truncated to
//! 800 chars, typed as `Memory`.

use mnemos_core::prelude::Atom;
use mnemos_fulltext::{InvertedIndex, SearchFilter};

const PREVIEW_CHARS: usize = 800;

fn truncate_preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((byte_idx, _)) => content[..byte_idx].to_string(),
        None => content.to_string(),
    }
}

/// Spec.md §4.C6 "Inverted-index targeted search". `whitelist`, when
/// non-empty, restricts hits to those whose `path` is a member.
#[must_use]
pub fn targeted_search(index: &InvertedIndex, query: &str, filter: Option<&SearchFilter>, whitelist: &[String], k: usize) -> Vec<Atom> {
    let Ok(hits) = index.search(query, filter, k) else { return Vec::new() };
    hits.into_iter()
        .filter(|hit| whitelist.is_empty() || whitelist.contains(&hit.fields.path))
        .map(|hit| Atom::memory(truncate_preview(&hit.fields.content), hit.fields.filename, "memory", hit.rank))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemos_fulltext::DocumentFields;

    fn doc(path: &str, content: &str) -> DocumentFields {
        DocumentFields { path: path.to_string(), filename: path.to_string(), content: content.to_string(), ..Default::default() }
    }

    #[test]
    fn whitelist_restricts_hits_to_listed_paths() {
        let index = InvertedIndex::open_in_memory().unwrap();
        index.update(doc("a.md", "needle phrase here")).unwrap();
        index.update(doc("b.md", "needle phrase elsewhere")).unwrap();

        let whitelist = vec!["a.md".to_string()];
        let hits = targeted_search(&index, "needle", None, &whitelist, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title(), "a.md");
    }

    #[test]
    fn empty_whitelist_means_unrestricted() {
        let index = InvertedIndex::open_in_memory().unwrap();
        index.update(doc("a.md", "needle phrase here")).unwrap();
        index.update(doc("b.md", "needle phrase elsewhere")).unwrap();
        let hits = targeted_search(&index, "needle", None, &[], 10);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn preview_is_truncated_to_800_chars() {
        let index = InvertedIndex::open_in_memory().unwrap();
        let long_content = "word ".repeat(400);
        index.update(doc("a.md", &long_content)).unwrap();
        let hits = targeted_search(&index, "word", None, &[], 10);
        assert!(hits[0].content().chars().count() <= PREVIEW_CHARS);
    }
}
