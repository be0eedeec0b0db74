//! A-posteriori coherence verdict (spec.md §4.C7): `coherence(rag_context,
//! prompt, response) -> JudgeVerdict`, backed by the small-model client.

use crate::stats::JudgeStats;
use mnemos_config::components::JudgeLimitesConfig;
use mnemos_core::json_extract::extract_json_object;
use mnemos_core::prelude::JudgeVerdict;
use mnemos_llm::CompletionClient;
use std::sync::Arc;

const TRUNCATION_MARKER: &str = "\n\n[... context truncated ...]\n\n";

fn build_judge_prompt(rag_context: &str, prompt: &str, response: &str) -> String {
    format!(
        "You are an impartial evaluator. Decide whether every factual claim in the \
         RESPONSE is supported by the CONTEXT. Return strict JSON {{\"reason\": string, \
         \"score\": number}} where 1.0 means fully supported, 0.5 means uncertain, and \
         0.0 means hallucination or contradiction.\n\nCONTEXT:\n{rag_context}\n\nPROMPT:\n{prompt}\n\nRESPONSE:\n{response}"
    )
}

/// `coherence(rag_context, prompt, response)` (spec.md §4.C7 A-posteriori
/// coherence). Abstains (`score=0.5, valid=true`) whenever the context is
/// too short, too large even after truncation, or the small-model call
/// fails in any way — coherence checking never blocks a turn.
pub async fn coherence(
    client: &Arc<dyn CompletionClient>,
    stats: &JudgeStats,
    rag_context: &str,
    prompt: &str,
    response: &str,
    limits: &JudgeLimitesConfig,
    threshold: f64,
) -> JudgeVerdict {
    if rag_context.chars().count() < limits.min_chars_contexte {
        let verdict = JudgeVerdict::abstain("context too short: abstention");
        stats.record_coherence(verdict.score, false);
        return verdict;
    }

    let mut context = rag_context.to_string();
    if context.chars().count() > limits.max_chars_contexte {
        let truncated: String = context.chars().take(limits.max_chars_contexte).collect();
        context = format!("{truncated}{TRUNCATION_MARKER}");
    }

    let judge_prompt = build_judge_prompt(&context, prompt, response);
    if judge_prompt.chars().count() > limits.max_chars_contexte + limits.marge_prompt_total {
        let verdict = JudgeVerdict::abstain("judge prompt too large: abstention");
        stats.record_coherence(verdict.score, false);
        return verdict;
    }

    let verdict = match client.generate(&judge_prompt).await {
        Ok(body) if !body.trim().is_empty() => {
            let parsed = extract_json_object(&body);
            match parsed.get("score").and_then(serde_json::Value::as_f64) {
                Some(raw_score) => {
                    let reason = parsed.get("reason").and_then(|v| v.as_str()).unwrap_or("no reason given").to_string();
                    let mut details = std::collections::HashMap::new();
                    details.insert("raw_response".to_string(), serde_json::Value::String(body));
                    JudgeVerdict::new(raw_score, reason, threshold, details)
                }
                None => JudgeVerdict::abstain("judge response missing 'score' field: abstention"),
            }
        }
        Ok(_) => JudgeVerdict::abstain("judge returned an empty body: abstention"),
        Err(e) => {
            tracing::warn!(error = %e, "judge small-model call failed");
            JudgeVerdict::abstain(format!("judge call failed: {e}"))
        }
    };

    stats.record_coherence(verdict.score, !verdict.valid);
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mnemos_core::MnemosError;
    use mnemos_llm::TokenStream;

    struct StubClient {
        response: String,
    }

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn generate(&self, _prompt: &str) -> Result<String, MnemosError> {
            Ok(self.response.clone())
        }
        async fn stream(&self, _prompt: &str) -> Result<TokenStream, MnemosError> {
            unimplemented!()
        }
        async fn health_check(&self) -> Result<(), MnemosError> {
            Ok(())
        }
        fn name(&self) -> &str {
            "stub"
        }
    }

    fn limits() -> JudgeLimitesConfig {
        JudgeLimitesConfig { min_chars_contexte: 10, max_chars_contexte: 4000, marge_prompt_total: 8000 }
    }

    #[tokio::test]
    async fn short_context_abstains_without_calling_the_model() {
        let client: Arc<dyn CompletionClient> = Arc::new(StubClient { response: "should not be used".to_string() });
        let stats = JudgeStats::new("judge", 0.1);
        let verdict = coherence(&client, &stats, "short", "p", "r", &limits(), 0.6).await;
        assert!(verdict.valid);
        assert_eq!(verdict.score, 0.5);
        assert!(verdict.reason.contains("too short"));
    }

    #[tokio::test]
    async fn well_formed_response_is_parsed_and_clamped() {
        let client: Arc<dyn CompletionClient> = Arc::new(StubClient { response: r#"{"reason": "fully supported", "score": 0.95}"#.to_string() });
        let stats = JudgeStats::new("judge", 0.1);
        let context = "a".repeat(50);
        let verdict = coherence(&client, &stats, &context, "p", "r", &limits(), 0.6).await;
        assert_eq!(verdict.score, 0.95);
        assert!(verdict.valid);
        assert_eq!(verdict.reason, "fully supported");
    }

    #[tokio::test]
    async fn missing_score_field_abstains() {
        let client: Arc<dyn CompletionClient> = Arc::new(StubClient { response: r#"{"reason": "no idea"}"#.to_string() });
        let stats = JudgeStats::new("judge", 0.1);
        let context = "a".repeat(50);
        let verdict = coherence(&client, &stats, &context, "p", "r", &limits(), 0.6).await;
        assert!(verdict.valid);
        assert_eq!(verdict.score, 0.5);
    }
}
