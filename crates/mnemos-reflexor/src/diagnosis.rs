//! Alert-triggered diagnosis (spec.md §4.C12 steps 1-6), grounded on
//! `agent_Reflexor.py`'s `analyser_erreur` / `proposer_correction`.

use chrono::Utc;
use mnemos_core::json_extract::extract_json_object;
use mnemos_core::prelude::MnemosError;
use mnemos_llm::CompletionClient;
use mnemos_memory::MemoryManager;
use mnemos_vectorstore::VectorStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// `ecart_type` mapped to an enumerated set (spec.md §4.C12 step 4).
/// Unknown strings fall back to `Technical` with a logged warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ecart {
    Hallucination,
    Governance,
    Logic,
    Bias,
    Visual,
    Technical,
}

impl Ecart {
    #[must_use]
    pub fn from_str_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "hallucination" => Ecart::Hallucination,
            "governance" | "gouvernance" => Ecart::Governance,
            "logic" | "logique" => Ecart::Logic,
            "bias" | "biais" => Ecart::Bias,
            "visual" | "visuel" => Ecart::Visual,
            "technical" | "technique" => Ecart::Technical,
            other => {
                tracing::warn!(raw = other, "unrecognised ecart_type, defaulting to Technical");
                Ecart::Technical
            }
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Ecart::Hallucination => "Hallucination",
            Ecart::Governance => "Governance",
            Ecart::Logic => "Logic",
            Ecart::Bias => "Bias",
            Ecart::Visual => "Visual",
            Ecart::Technical => "Technical",
        }
    }
}

/// A markdown-serialisable diagnosis record (spec.md §4.C12 step 5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflexiveJournalEntry {
    pub committed_error: String,
    pub ecart_type: Ecart,
    pub violated_rule: String,
    pub causal_hypothesis: String,
    pub immediate_correction: String,
    pub timestamp: chrono::DateTime<Utc>,
}

impl ReflexiveJournalEntry {
    /// Best-effort fallback used when the analysis JSON cannot be parsed
    /// at all (spec.md §4.C12 step 3: "synthesise a fallback record with
    /// `ecart_type="Technical"`").
    #[must_use]
    pub fn fallback(reason: &str) -> Self {
        Self {
            committed_error: format!("unable to determine: {reason}"),
            ecart_type: Ecart::Technical,
            violated_rule: String::new(),
            causal_hypothesis: "analysis response was not valid JSON".to_string(),
            immediate_correction: String::new(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn to_markdown(&self) -> String {
        format!(
            "### Reflexive trace ({})\n\n- **Error**: {}\n- **Type**: {}\n- **Violated rule**: {}\n- **Hypothesis**: {}\n- **Immediate correction**: {}\n",
            self.timestamp.to_rfc3339(),
            self.committed_error,
            self.ecart_type.as_str(),
            self.violated_rule,
            self.causal_hypothesis,
            self.immediate_correction,
        )
    }
}

fn parse_diagnosis(raw: &str) -> ReflexiveJournalEntry {
    let parsed = extract_json_object(raw);
    if parsed.is_empty() {
        return ReflexiveJournalEntry::fallback("empty or unparseable analysis response");
    }
    let field = |key: &str| parsed.get(key).and_then(|v| v.as_str()).unwrap_or_default().to_string();
    ReflexiveJournalEntry {
        committed_error: field("committed_error"),
        ecart_type: Ecart::from_str_lenient(&field("ecart_type")),
        violated_rule: field("violated_rule"),
        causal_hypothesis: field("causal_hypothesis"),
        immediate_correction: field("immediate_correction"),
        timestamp: Utc::now(),
    }
}

fn build_analysis_prompt(recent_history: &[String], similar_cases: &[String]) -> String {
    let history_block = recent_history.join("\n");
    let cases_block = if similar_cases.is_empty() {
        "none on record".to_string()
    } else {
        similar_cases.join("\n---\n")
    };
    format!(
        "You are reviewing a conversation flagged by the user as incorrect. \
         Return strict JSON with keys committed_error, ecart_type \
         (one of Hallucination, Governance, Logic, Bias, Visual, Technical), \
         violated_rule, causal_hypothesis, immediate_correction.\n\n\
         RECENT CONVERSATION:\n{history_block}\n\nSIMILAR PAST INCIDENTS:\n{cases_block}"
    )
}

fn build_correction_prompt(entry: &ReflexiveJournalEntry) -> String {
    format!(
        "Based on this causal hypothesis, write one corrective rule as a short \
         imperative sentence, or the single word NONE if no durable rule applies.\n\n\
         HYPOTHESIS: {}\nVIOLATED RULE: {}",
        entry.causal_hypothesis, entry.violated_rule
    )
}

/// Runs the alert-triggered diagnosis loop (spec.md §4.C12).
pub struct Reflexor {
    client: Arc<dyn CompletionClient>,
    memory: Arc<MemoryManager>,
    narrative: Arc<VectorStore>,
    top_k: usize,
}

impl Reflexor {
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>, memory: Arc<MemoryManager>, narrative: Arc<VectorStore>, top_k: usize) -> Self {
        Self { client, memory, narrative, top_k }
    }

    /// Full pipeline: retrieve similar incidents, diagnose, journal, and
    /// (if warranted) persist a corrective rule into the legislative
    /// store (spec.md §4.C12 steps 1-6).
    pub async fn analyze(&self, recent_history: &[String]) -> Result<ReflexiveJournalEntry, MnemosError> {
        tracing::info!(agent = "reflexor", history_lines = recent_history.len(), "alert-triggered analysis starting");
        let similar_cases = self.similar_incidents(recent_history.last().map(String::as_str).unwrap_or_default())?;

        let analysis_prompt = build_analysis_prompt(recent_history, &similar_cases);
        let raw = self.client.generate(&analysis_prompt).await.unwrap_or_default();
        let entry = if raw.trim().is_empty() { ReflexiveJournalEntry::fallback("empty analysis response") } else { parse_diagnosis(&raw) };
        tracing::debug!(agent = "reflexor", ecart_type = entry.ecart_type.as_str(), "diagnosis produced");

        self.memory.journal_reflexive_trace(&entry.to_markdown(), "reflexive", entry.ecart_type.as_str())?;

        if entry.causal_hypothesis.is_empty() {
            return Ok(entry);
        }
        let correction_raw = self.client.generate(&build_correction_prompt(&entry)).await.unwrap_or_default();
        let correction = correction_raw.trim();
        if !correction.is_empty() && !correction.eq_ignore_ascii_case("none") {
            let key = format!("R_CORRECTION_{}", Utc::now().format("%Y%m%d_%H%M%S"));
            let mut metadata = serde_json::Map::new();
            metadata.insert("rule".to_string(), serde_json::Value::String(correction.to_string()));
            metadata.insert("violated_rule".to_string(), serde_json::Value::String(entry.violated_rule.clone()));
            self.memory.vectorise_rule(&key, correction, metadata.clone(), entry.ecart_type.as_str())?;
            let mut body = serde_json::Map::new();
            body.insert("rule".to_string(), serde_json::Value::String(correction.to_string()));
            body.insert("meta".to_string(), serde_json::Value::Object(metadata));
            self.memory.save_memory("regles", &format!("{key}.json"), &serde_json::Value::Object(body))?;
            tracing::info!(agent = "reflexor", rule_key = %key, "corrective rule persisted and vectorised into the legislative store");
        }

        Ok(entry)
    }

    fn similar_incidents(&self, query: &str) -> Result<Vec<String>, MnemosError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .narrative
            .search(query, self.top_k)?
            .into_iter()
            .filter_map(|hit| hit.meta.get("content").and_then(|v| v.as_str()).map(str::to_string))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecart_from_str_is_case_insensitive_and_defaults_to_technical() {
        assert_eq!(Ecart::from_str_lenient("Hallucination"), Ecart::Hallucination);
        assert_eq!(Ecart::from_str_lenient("BIAS"), Ecart::Bias);
        assert_eq!(Ecart::from_str_lenient("something else"), Ecart::Technical);
    }

    #[test]
    fn parse_diagnosis_falls_back_on_garbage_input() {
        let entry = parse_diagnosis("not json at all");
        assert_eq!(entry.ecart_type, Ecart::Technical);
        assert!(entry.committed_error.starts_with("unable to determine"));
    }

    #[test]
    fn parse_diagnosis_extracts_fields_from_valid_json() {
        let raw = r#"{"committed_error": "misread the file", "ecart_type": "technical", "violated_rule": "R_1", "causal_hypothesis": "stale cache", "immediate_correction": "re-read the file"}"#;
        let entry = parse_diagnosis(raw);
        assert_eq!(entry.committed_error, "misread the file");
        assert_eq!(entry.ecart_type, Ecart::Technical);
        assert_eq!(entry.immediate_correction, "re-read the file");
    }

    #[test]
    fn journal_entry_markdown_contains_all_fields() {
        let entry = ReflexiveJournalEntry {
            committed_error: "wrong answer".to_string(),
            ecart_type: Ecart::Logic,
            violated_rule: "R_2".to_string(),
            causal_hypothesis: "bad retrieval".to_string(),
            immediate_correction: "re-check context".to_string(),
            timestamp: Utc::now(),
        };
        let markdown = entry.to_markdown();
        assert!(markdown.contains("wrong answer"));
        assert!(markdown.contains("Logic"));
        assert!(markdown.contains("R_2"));
    }
}
