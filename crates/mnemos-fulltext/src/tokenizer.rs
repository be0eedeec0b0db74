//! Content analyser (spec.md §4.C3): "a word-regex tokeniser followed by
//! lower-casing (no stop-word removal, no stemming beyond this)". Kept
//! separate from `mnemos-judge`'s tokenizer, which layers stop-word
//! removal and poor-stemming on top of the same word-regex idea.

use regex::Regex;
use std::sync::LazyLock;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("static regex"));

/// Splits `text` on the word-regex and lower-cases every token. This is
/// the analyser fed to SQLite's FTS5 tokenizer indirectly — we don't rely
/// on FTS5's own `unicode61` tokenizer so that the exact token shape
/// matches what `mnemos-judge`'s a-priori scorer expects when it
/// re-derives tokens from the same content.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    WORD_RE.find_iter(text).map(|m| m.as_str().to_lowercase()).collect()
}

/// Escapes a raw user query for safe embedding inside an FTS5 `MATCH`
/// expression: each token is individually double-quoted, neutralising
/// FTS5's own query-syntax operators (`AND`, `NOT`, `*`, `NEAR`, `-`) so a
/// user-typed query string can never be (mis)interpreted as a query
/// operator, per spec.md §4.C3's column/field parser.
#[must_use]
pub fn sanitize_fts5_query(raw: &str) -> String {
    tokenize(raw).into_iter().map(|t| format!("\"{}\"", t.replace('"', "\"\""))).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_splits_on_word_boundaries() {
        assert_eq!(tokenize("Hello, World!"), vec!["hello", "world"]);
    }

    #[test]
    fn sanitize_quotes_every_token() {
        assert_eq!(sanitize_fts5_query("NOT foo"), "\"not\" \"foo\"");
    }
}
