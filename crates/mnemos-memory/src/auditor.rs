//! Schema auditor (spec.md §4.C5 policy, §7 "Schema violation on
//! output"): checked before any L1/L2/L3 write. Violations never block
//! persistence — they are logged and appended to a runtime violations
//! journal so the failure is visible without aborting the turn.

use chrono::Utc;
use mnemos_config::PathRegistry;
use mnemos_core::prelude::Interaction;
use std::io::Write;

/// Validates the required-non-null fields of an [`Interaction`] before a
/// write. Returns the list of violations found (empty means clean).
#[must_use]
pub fn audit_interaction(interaction: &Interaction) -> Vec<String> {
    let mut violations = Vec::new();
    if interaction.meta.id.is_empty() {
        violations.push("meta.id is empty".to_string());
    }
    if interaction.meta.session_id.is_empty() {
        violations.push("meta.session_id is empty".to_string());
    }
    if interaction.prompt.is_empty() {
        violations.push("prompt is empty".to_string());
    }
    if !(0.0..=1.0).contains(&interaction.meta.quality_score) {
        violations.push(format!("meta.quality_score {} out of [0,1]", interaction.meta.quality_score));
    }
    violations
}

/// Runs the audit, logs a warning per violation, and appends a structured
/// line to `{root}/.schema_violations.jsonl` for each one found. Never
/// fails the caller — persistence still proceeds per spec.md §7.
pub fn audit_and_log(paths: &PathRegistry, interaction: &Interaction) {
    let violations = audit_interaction(interaction);
    if violations.is_empty() {
        return;
    }
    for violation in &violations {
        tracing::warn!(interaction_id = %interaction.meta.id, violation, "schema auditor found a violation");
    }
    if let Err(e) = append_violations(paths, interaction, &violations) {
        tracing::warn!(error = %e, "failed to append to schema violations journal");
    }
}

fn append_violations(paths: &PathRegistry, interaction: &Interaction, violations: &[String]) -> std::io::Result<()> {
    let path = paths.root().join(".schema_violations.jsonl");
    let record = serde_json::json!({
        "interaction_id": interaction.meta.id,
        "timestamp": Utc::now().to_rfc3339(),
        "violations": violations,
    });
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{record}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemos_core::prelude::*;
    use std::collections::HashMap;

    fn interaction_with_empty_id() -> Interaction {
        Interaction {
            prompt: "hi".to_string(),
            response: String::new(),
            system: String::new(),
            intent: Intent::new("hi", SubjectEnum::Unknown, ActionEnum::Unknown, CategoryEnum::Unknown),
            memory_context: Vec::new(),
            meta: InteractionMeta {
                id: String::new(),
                session_id: "s1".to_string(),
                message_turn: 1,
                timestamp: chrono::Utc::now(),
                source_agent: "x".to_string(),
                kind: "turn".to_string(),
                files_consulted: Vec::new(),
                judge_valid: true,
                quality_score: 0.5,
                details: String::new(),
                len_content: 0,
                free_data: HashMap::new(),
            },
        }
    }

    #[test]
    fn empty_id_is_a_violation() {
        let violations = audit_interaction(&interaction_with_empty_id());
        assert!(violations.iter().any(|v| v.contains("meta.id")));
    }

    #[test]
    fn audit_and_log_appends_one_line_per_violating_interaction() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = PathRegistry::new(tmp.path());
        audit_and_log(&paths, &interaction_with_empty_id());
        let content = std::fs::read_to_string(tmp.path().join(".schema_violations.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
