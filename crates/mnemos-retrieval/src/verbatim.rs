//! Verbatim search (spec.md §4.C6): candidates via the file locator
//! restricted to `historique/`, kept only if the exact phrase is a
//! substring of the file text. Avoids tokenisation false-positives.

use mnemos_core::prelude::Atom;
use mnemos_filelocator::FileLocator;

/// Spec.md §4.C6 "Verbatim": survivors get `score=10.0,
/// kind="verbatim_proven"`.
#[must_use]
pub fn verbatim_search(locator: &FileLocator, phrase_exact: &str, limit: usize) -> Vec<Atom> {
    let query = format!("content:\"{phrase_exact}\"");
    let candidates = locator.find(query, limit);
    candidates
        .into_iter()
        .filter_map(|path| {
            let text = std::fs::read_to_string(&path).ok()?;
            if text.contains(phrase_exact) {
                Some(Atom::memory(text, path, "verbatim_proven", 10.0))
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_files_containing_the_exact_phrase_survive() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.json"), "the quick brown fox").unwrap();
        std::fs::write(tmp.path().join("b.json"), "the slow brown fox").unwrap();

        let locator = FileLocator::new(None, tmp.path());
        let hits = verbatim_search(&locator, "quick brown", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score(), 10.0);
        assert_eq!(hits[0].fields().kind, "verbatim_proven");
    }
}
