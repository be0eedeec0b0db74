//! Shared tokenisation for the READMEs/technical-docs filename filter and
//! the judge's recall scoring (spec.md §4.C6, §4.C7): accent-fold,
//! lower-case, split camelCase, then split on non-alphanumeric runs.

use mnemos_core::prelude::fold_accents;

/// Splits `s` at lower→upper boundaries, e.g. `"fooBarBaz"` -> `["foo",
/// "Bar", "Baz"]`, before the caller lower-cases and further splits.
fn split_camel_case(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in s.chars() {
        if c.is_uppercase() && prev_lower {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Normalises free text into a lower-cased, accent-folded token set,
/// splitting on camelCase boundaries and any run of non-alphanumeric
/// characters (spec.md §4.C6 README filter: "split on `_`, `-`").
#[must_use]
pub fn normalize_tokens(text: &str) -> Vec<String> {
    let folded = fold_accents(&text.to_lowercase());
    let mut tokens = Vec::new();
    for chunk in split_camel_case(&folded) {
        for piece in chunk.split(|c: char| !c.is_alphanumeric()) {
            if !piece.is_empty() {
                tokens.push(piece.to_lowercase());
            }
        }
    }
    tokens
}

/// Extracts the key tokens embedded in a `README_<tokens>.md` filename
/// (spec.md §4.C6: "extract key tokens from the filename between
/// `README_` and `.md`, split on `_`, `-`").
#[must_use]
pub fn readme_key_tokens(filename: &str) -> Vec<String> {
    let stem = filename.strip_prefix("README_").unwrap_or(filename).trim_end_matches(".md");
    normalize_tokens(stem)
}

/// True if every token in `subset` is present in `superset` (spec.md
/// §4.C6: "drop files whose key tokens are **not a subset** of the
/// prompt tokens").
#[must_use]
pub fn is_token_subset(subset: &[String], superset: &[String]) -> bool {
    subset.iter().all(|t| superset.contains(t))
}
