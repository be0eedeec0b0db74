//! A-priori relevance scorer (spec.md §4.C7): `score(prompt, content,
//! title, semantic_filters) -> [0,1]`.

use mnemos_config::components::PertinenceConfig;
use std::collections::HashSet;
use std::sync::LazyLock;

static WORD_RE: LazyLock<regex::Regex> = LazyLock::new(|| regex::Regex::new(r"\w+").expect("static regex"));

/// Word-regex -> lowercase -> drop stop-words and single-char tokens ->
/// "poor stemming" (trim trailing `s` if `len>3`, trailing `x` if
/// `len>4`) (spec.md §4.C7 step 1).
fn tokenize(text: &str, stop_words: &HashSet<&str>) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| t.len() > 1 && !stop_words.contains(t.as_str()))
        .map(|t| poor_stem(&t))
        .collect()
}

fn poor_stem(token: &str) -> String {
    if token.len() > 4 && token.ends_with('x') {
        token[..token.len() - 1].to_string()
    } else if token.len() > 3 && token.ends_with('s') {
        token[..token.len() - 1].to_string()
    } else {
        token.to_string()
    }
}

/// Filename-normalised tokens: underscore and dot become spaces, then the
/// same tokenisation as body text (spec.md §4.C7 step 3).
fn title_tokens(title: &str, stop_words: &HashSet<&str>) -> Vec<String> {
    let normalised = title.replace(['_', '.'], " ");
    tokenize(&normalised, stop_words)
}

fn recall(prompt_tokens: &[String], candidate_tokens: &[String]) -> f64 {
    if prompt_tokens.is_empty() {
        return 0.0;
    }
    let candidate_set: HashSet<&str> = candidate_tokens.iter().map(String::as_str).collect();
    let hits = prompt_tokens.iter().filter(|t| candidate_set.contains(t.as_str())).count();
    hits as f64 / prompt_tokens.len() as f64
}

/// `score(prompt, content, title, semantic_filters)` (spec.md §4.C7
/// A-priori relevance).
#[must_use]
pub fn score(prompt: &str, content: &str, title: &str, semantic_filters: &[String], config: &PertinenceConfig) -> f64 {
    let stop_words: HashSet<&str> = config.stop_words.iter().map(String::as_str).collect();

    let prompt_tokens = tokenize(prompt, &stop_words);
    let content_tokens = tokenize(content, &stop_words);
    let title_tokens = title_tokens(title, &stop_words);

    let content_score = recall(&prompt_tokens, &content_tokens);
    let title_score = (recall(&prompt_tokens, &title_tokens) * config.boost_titre).min(1.0);
    let base = content_score.max(title_score);

    let combined = format!("{} {}", content, title).to_lowercase();
    let mut bonus = 0.0;
    for subject in semantic_filters {
        let lowered = subject.to_lowercase();
        if lowered != "unknown" && combined.contains(&lowered) {
            bonus += config.bonus_sujet;
        }
    }

    let raw = (base + bonus).min(1.0);
    (raw * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PertinenceConfig {
        PertinenceConfig::default()
    }

    #[test]
    fn exact_content_match_scores_high() {
        let s = score("explain the retry logic", "the retry logic retries three times", "notes", &[], &config());
        assert!(s > 0.3);
    }

    #[test]
    fn unrelated_content_scores_zero() {
        let s = score("explain the retry logic", "a recipe for bread", "notes", &[], &config());
        assert_eq!(s, 0.0);
    }

    #[test]
    fn title_match_is_boosted_and_clamped() {
        let s = score("retry logic", "irrelevant body text", "retry_logic_notes.md", &[], &config());
        assert!(s > 0.0);
        assert!(s <= 1.0);
    }

    #[test]
    fn subject_bonus_applies_once_per_matching_subject() {
        let base = score("explain the bug", "there is a bug in the parser", "notes", &[], &config());
        let boosted = score("explain the bug", "there is a bug in the parser", "notes", &["code".to_string()], &config());
        assert!(boosted >= base);
    }

    #[test]
    fn poor_stemming_matches_plurals() {
        let s = score("explain the bugs", "one bug was found", "notes", &[], &config());
        assert!(s > 0.0);
    }

    #[test]
    fn score_is_rounded_to_three_decimals() {
        let s = score("retry logic retry logic retry", "retry logic retry logic", "notes", &[], &config());
        assert_eq!((s * 1000.0).fract(), 0.0);
    }
}
