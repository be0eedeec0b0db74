//! `JudgeVerdict` (spec.md §3, §4.C7).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of an a-posteriori coherence check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub valid: bool,
    pub score: f64,
    pub reason: String,
    pub details: HashMap<String, serde_json::Value>,
}

impl JudgeVerdict {
    /// Construct a verdict, enforcing the invariants spec.md §8 (7)
    /// requires: `score` clamped into `[0, 1]` and `valid` derived from
    /// `threshold`, never set independently by a caller.
    #[must_use]
    pub fn new(score: f64, reason: impl Into<String>, threshold: f64, details: HashMap<String, serde_json::Value>) -> Self {
        let score = score.clamp(0.0, 1.0);
        Self { valid: score >= threshold, score, reason: reason.into(), details }
    }

    /// A neutral abstention verdict (spec.md §4.C7 steps 1/2/4):
    /// `valid = true`, `score = 0.5`.
    #[must_use]
    pub fn abstain(reason: impl Into<String>) -> Self {
        Self { valid: true, score: 0.5, reason: reason.into(), details: HashMap::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abstention_is_valid_with_neutral_score() {
        let verdict = JudgeVerdict::abstain("context too short: abstention");
        assert!(verdict.valid);
        assert!((verdict.score - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn score_is_clamped_and_valid_follows_threshold() {
        let verdict = JudgeVerdict::new(1.7, "over", 0.6, HashMap::new());
        assert_eq!(verdict.score, 1.0);
        assert!(verdict.valid);

        let verdict = JudgeVerdict::new(-0.3, "under", 0.6, HashMap::new());
        assert_eq!(verdict.score, 0.0);
        assert!(!verdict.valid);
    }
}
