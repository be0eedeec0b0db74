//! READMEs and technical documentation (spec.md §4.C6).

use crate::tokens::{is_token_subset, normalize_tokens, readme_key_tokens};
use mnemos_core::prelude::Atom;
use std::path::Path;

/// Locates `README_*.md` under `dir`, keeping only files whose key
/// tokens (extracted from the filename) are a subset of the prompt's
/// tokens, and emits `ReadmeFile` atoms for the survivors (spec.md §4.C6
/// "READMEs").
#[must_use]
pub fn readmes_for_prompt(dir: &Path, prompt: &str) -> Vec<Atom> {
    let Ok(entries) = std::fs::read_dir(dir) else { return Vec::new() };
    let prompt_tokens = normalize_tokens(prompt);
    let mut out = Vec::new();
    for entry in entries.flatten() {
        let filename = entry.file_name().to_string_lossy().to_string();
        if !filename.starts_with("README_") || !filename.ends_with(".md") {
            continue;
        }
        let key_tokens = readme_key_tokens(&filename);
        if !is_token_subset(&key_tokens, &prompt_tokens) {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(entry.path()) else { continue };
        out.push(Atom::readme(content, filename, entry.path().to_string_lossy().to_string()));
    }
    out
}

/// Same filter over the technical-documentation subdirectory, yielding
/// `TechDoc`-shaped content wrapped as `Memory` atoms with
/// `kind="tech_doc"` (spec.md §4.C6 "Technical documentation").
#[must_use]
pub fn tech_docs_for_prompt(dir: &Path, prompt: &str) -> Vec<Atom> {
    let Ok(entries) = std::fs::read_dir(dir) else { return Vec::new() };
    let prompt_tokens = normalize_tokens(prompt);
    let mut out = Vec::new();
    for entry in entries.flatten() {
        let filename = entry.file_name().to_string_lossy().to_string();
        let key_tokens = normalize_tokens(filename.trim_end_matches(".md"));
        if !is_token_subset(&key_tokens, &prompt_tokens) {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(entry.path()) else { continue };
        out.push(Atom::memory(content, filename, "tech_doc", 1.0));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subset_readmes_survive_the_filter() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("README_code.md"), "code docs").unwrap();
        std::fs::write(tmp.path().join("README_deploiement.md"), "deploy docs").unwrap();
        std::fs::write(tmp.path().join("not_a_readme.md"), "ignored").unwrap();

        let hits = readmes_for_prompt(tmp.path(), "explain the code please");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title(), "README_code.md");
    }

    #[test]
    fn no_match_yields_empty_vec_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("README_deploiement.md"), "deploy docs").unwrap();
        assert!(readmes_for_prompt(tmp.path(), "talk about code").is_empty());
    }
}
