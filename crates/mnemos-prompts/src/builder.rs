//! `build(request) -> String` (spec.md §4.C9): dispatches on
//! [`PromptRequest`], assembling the system section from three on-disk
//! markdown assets and a variant-specific user section, then wraps the
//! result in ChatML.

use crate::chatml::wrap;
use crate::field_tracker::FieldTracker;
use crate::sections::{format_code_chunks, format_history, format_memories, format_memory_atoms, format_readmes, format_rules};
use mnemos_config::components::PromptConfig;
use mnemos_core::prelude::{MnemosError, PromptRequest, Result};
use std::path::Path;

fn read_optional(root: &Path, relative: &str) -> String {
    std::fs::read_to_string(root.join(relative)).unwrap_or_else(|e| {
        tracing::debug!(path = relative, error = %e, "optional prompt asset not found, using empty section");
        String::new()
    })
}

fn read_required(root: &Path, relative: &str) -> Result<String> {
    std::fs::read_to_string(root.join(relative)).map_err(|e| MnemosError::missing_critical_asset(format!("tool_instructions at {relative}: {e}")))
}

fn system_section(root: &Path, config: &PromptConfig) -> Result<String> {
    let user_profile = read_optional(root, &config.user_profile_path);
    let system_summary = read_optional(root, &config.system_summary_path);
    let tool_instructions = read_required(root, &config.tool_instructions_path)?;
    Ok(format!("{user_profile}\n\n{system_summary}\n\n{tool_instructions}"))
}

/// Dispatches `request` to its variant-specific template and wraps the
/// result in ChatML. Fails only if `tool_instructions` is missing from
/// disk (spec.md §4.C9: "missing file = fatal").
pub fn build(request: &PromptRequest, root: &Path, config: &PromptConfig) -> Result<String> {
    let system = system_section(root, config)?;
    let variant = request.variant_name();

    let user = match request {
        PromptRequest::Standard { prompt, intent: _, rules, readmes, memories, history } => {
            let tracker = FieldTracker::new(variant, &["prompt", "intent", "rules", "readmes", "memories", "history"]);
            tracker.mark("prompt");
            tracker.mark("rules");
            tracker.mark("readmes");
            tracker.mark("memories");
            tracker.mark("history");
            let rendered = format!("{}{}{}{}\n{prompt}", format_rules(rules), format_readmes(readmes), format_memories(memories), format_history(history));
            tracker.report_unread();
            rendered
        }
        PromptRequest::StandardCode { prompt, intent: _, rules, readmes, code_chunks, history } => {
            let tracker = FieldTracker::new(variant, &["prompt", "intent", "rules", "readmes", "code_chunks", "history"]);
            tracker.mark("prompt");
            tracker.mark("rules");
            tracker.mark("readmes");
            tracker.mark("code_chunks");
            tracker.mark("history");
            let rendered = format!("{}{}{}{}\n{prompt}", format_rules(rules), format_readmes(readmes), format_code_chunks(code_chunks), format_history(history));
            tracker.report_unread();
            rendered
        }
        PromptRequest::ManualContextCode { prompt, intent: _, user_code, rules } => {
            let tracker = FieldTracker::new(variant, &["prompt", "intent", "user_code", "rules"]);
            tracker.mark("prompt");
            tracker.mark("user_code");
            tracker.mark("rules");
            let rendered = format!("{}### User-Supplied Code\n```\n{user_code}\n```\n\n{prompt}", format_rules(rules));
            tracker.report_unread();
            rendered
        }
        PromptRequest::NewChat { system_summary, last_session_history } => {
            let tracker = FieldTracker::new(variant, &["system_summary", "last_session_history"]);
            tracker.mark("system_summary");
            tracker.mark("last_session_history");
            let rendered = format!("### System Summary (cold start)\n{system_summary}\n\n{}\nContinue the conversation.", format_history(last_session_history));
            tracker.report_unread();
            rendered
        }
        PromptRequest::MemorySearchFirst { prompt, intent: _, found_memories, plan } => {
            let tracker = FieldTracker::new(variant, &["prompt", "intent", "found_memories", "plan"]);
            tracker.mark("prompt");
            tracker.mark("found_memories");
            let plan_section = match plan {
                Some(plan) => {
                    tracker.mark("plan");
                    format!("### Proposed Plan\nObjective: {}\nSteps:\n{}\n\n", plan.global_objective, plan.steps.join("\n"))
                }
                None => String::new(),
            };
            let rendered = format!("{}{plan_section}\n{prompt}", format_memory_atoms(found_memories));
            tracker.report_unread();
            rendered
        }
        PromptRequest::MemorySearch { prompt, intent: _, found_memories, plan } => {
            let tracker = FieldTracker::new(variant, &["prompt", "intent", "found_memories", "plan"]);
            tracker.mark("prompt");
            tracker.mark("found_memories");
            tracker.mark("plan");
            let plan_section = format!("### Active Plan\nObjective: {}\nSteps:\n{}\n\n", plan.global_objective, plan.steps.join("\n"));
            let rendered = format!("{}{plan_section}\n{prompt}", format_memory_atoms(found_memories));
            tracker.report_unread();
            rendered
        }
        PromptRequest::Cartography { prompt, cartography } => {
            let tracker = FieldTracker::new(variant, &["prompt", "cartography"]);
            tracker.mark("prompt");
            tracker.mark("cartography");
            let rendered = format!("### Project Cartography\n{}\n\n{prompt}", cartography.content());
            tracker.report_unread();
            rendered
        }
        PromptRequest::FileInspection { prompt, file_atom, intent: _ } => {
            let tracker = FieldTracker::new(variant, &["prompt", "file_atom", "intent"]);
            tracker.mark("prompt");
            tracker.mark("file_atom");
            let rendered = format!("### File Under Inspection: {}\n{}\n\n{prompt}", file_atom.title(), file_atom.content());
            tracker.report_unread();
            rendered
        }
        PromptRequest::StagingReview { prompt, staged_summary } => {
            let tracker = FieldTracker::new(variant, &["prompt", "staged_summary"]);
            tracker.mark("prompt");
            tracker.mark("staged_summary");
            let rendered = format!("### Staged Summary\n{staged_summary}\n\n{prompt}");
            tracker.report_unread();
            rendered
        }
        PromptRequest::WebSearch { prompt, report_markdown } => {
            let tracker = FieldTracker::new(variant, &["prompt", "report_markdown"]);
            tracker.mark("prompt");
            tracker.mark("report_markdown");
            let rendered = format!("### Web Research Report\n{report_markdown}\n\n{prompt}");
            tracker.report_unread();
            rendered
        }
        PromptRequest::Protocol { prompt, alert_protocol, recent_history } => {
            let tracker = FieldTracker::new(variant, &["prompt", "alert_protocol", "recent_history"]);
            tracker.mark("prompt");
            tracker.mark("alert_protocol");
            tracker.mark("recent_history");
            let rendered = format!("### ALERT PROTOCOL\n{alert_protocol}\n\n{}\n{prompt}", format_history(recent_history));
            tracker.report_unread();
            rendered
        }
    };

    Ok(wrap(variant, &system, &user))
}

/// Distinct cold-start entry (spec.md §4.C9): injects `system_summary`
/// heavily plus the seeded last-session history, then appends the
/// incoming `prompt` as the live user turn.
pub fn build_first_chat_prompt(prompt: &str, system_summary: &str, last_session_history: &[String], root: &Path, config: &PromptConfig) -> Result<String> {
    let request = PromptRequest::NewChat { system_summary: system_summary.to_string(), last_session_history: last_session_history.to_vec() };
    let wrapped = build(&request, root, config)?;
    // The NewChat branch ends with a generic "Continue the conversation."
    // placeholder user line; splice in the real prompt instead.
    Ok(wrapped.replace("Continue the conversation.", prompt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemos_core::prelude::{ActionEnum, Atom, CategoryEnum, Intent, SubjectEnum};

    fn write_assets(root: &Path, config: &PromptConfig) {
        std::fs::create_dir_all(root.join("connaissances")).unwrap();
        std::fs::write(root.join(&config.tool_instructions_path), "Use tools via JSON.").unwrap();
    }

    #[test]
    fn missing_tool_instructions_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let config = PromptConfig::default();
        let request = PromptRequest::StagingReview { prompt: "hi".to_string(), staged_summary: "s".to_string() };
        let result = build(&request, tmp.path(), &config);
        assert!(matches!(result, Err(MnemosError::MissingCriticalAsset { .. })));
    }

    #[test]
    fn standard_prompt_includes_all_sections() {
        let tmp = tempfile::tempdir().unwrap();
        let config = PromptConfig::default();
        write_assets(tmp.path(), &config);
        let request = PromptRequest::Standard {
            prompt: "explain the bug".to_string(),
            intent: Intent::new("explain the bug", SubjectEnum::Code, ActionEnum::Explain, CategoryEnum::General),
            rules: vec![Atom::rule("be careful", "R_CARE")],
            readmes: vec![Atom::readme("docs", "README_x.md", "README_x.md")],
            memories: vec![mnemos_core::prelude::AtomFields { content: "note".to_string(), title: "m1".to_string(), kind: "raw_history".to_string(), score: 0.5 }],
            history: vec!["user: hi".to_string(), "assistant: hello".to_string()],
        };
        let rendered = build(&request, tmp.path(), &config).unwrap();
        assert!(rendered.starts_with("#! PROMPT_TYPE: Standard\n"));
        assert!(rendered.contains("R_CARE"));
        assert!(rendered.contains("README_x.md"));
        assert!(rendered.contains("note"));
        assert!(rendered.contains("explain the bug"));
        assert!(rendered.ends_with("<|im_start|>assistant\n"));
    }

    #[test]
    fn first_chat_prompt_splices_the_live_prompt_in() {
        let tmp = tempfile::tempdir().unwrap();
        let config = PromptConfig::default();
        write_assets(tmp.path(), &config);
        let rendered = build_first_chat_prompt("hello there", "booted fresh", &[], tmp.path(), &config).unwrap();
        assert!(rendered.contains("hello there"));
        assert!(!rendered.contains("Continue the conversation."));
    }
}
