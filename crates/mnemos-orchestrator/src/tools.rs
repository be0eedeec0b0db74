//! The tool-call surface (spec.md §6, §4.C11 step 9): the model's JSON
//! response names a next action via either its French-first
//! (`recherche_web`, `rechercher_memoire`, `lire_cartographie`,
//! `lire_fichier`) or English (`web_search`, `memory_search`,
//! `read_cartography`, `read_file`) vocabulary — both normalise to the
//! same [`ToolCall`].

use mnemos_core::prelude::{extract_json_object, repair_trailing_comma, ExecutionPlan};
use serde_json::Value;

/// One step of the bounded tool-call state machine (spec.md §8
/// invariant 8). `Unknown` is never constructed by `parse` — an
/// unrecognised function name falls through to `None` so the caller can
/// treat the whole response as natural language (spec.md §7 "Malformed
/// tool JSON").
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    WebSearch { query: String },
    MemorySearch { queries: Vec<String> },
    ReadCartography,
    ReadFile { filename: String },
    UpdateSystemSummary { content: String },
    FinalAnswer { content: String },
}

/// A parsed tool-call round: the action plus an optional plan update
/// (spec.md §6: "a `plan_update` field, when present, replaces the
/// session's `ExecutionPlan`").
#[derive(Debug, Clone)]
pub struct ToolRound {
    pub call: ToolCall,
    pub plan_update: Option<ExecutionPlan>,
}

/// Parses one model response into a [`ToolRound`]. Tries the raw text
/// first, then a trailing-comma repair pass, mirroring the judge/
/// consolidator JSON-repair convention (spec.md §9 "centralized robust
/// JSON parsing utility"). Returns `None` if no recognisable tool call
/// is present — the caller then treats the text as the final
/// natural-language response (spec.md §7).
#[must_use]
pub fn parse(raw: &str) -> Option<ToolRound> {
    try_parse(raw).or_else(|| try_parse(&repair_trailing_comma(raw)))
}

fn try_parse(raw: &str) -> Option<ToolRound> {
    let object = extract_json_object(raw);
    if object.is_empty() {
        return None;
    }

    // Wrapper form: {"next_action": {function, arguments}, "plan_update": {...}}.
    let (function, arguments) = if let Some(next_action) = object.get("next_action").and_then(Value::as_object) {
        (next_action.get("function")?.as_str()?, next_action.get("arguments").cloned().unwrap_or(Value::Object(Default::default())))
    } else {
        // Flat form: {"function": ..., "arguments": ...}.
        (object.get("function")?.as_str()?, object.get("arguments").cloned().unwrap_or(Value::Object(Default::default())))
    };

    let call = build_call(function, &arguments)?;
    let plan_update = object.get("plan_update").and_then(parse_plan_update);
    Some(ToolRound { call, plan_update })
}

fn build_call(function: &str, arguments: &Value) -> Option<ToolCall> {
    let arg_str = |key: &str| arguments.get(key).and_then(Value::as_str).map(str::to_string);

    match normalize_function_name(function) {
        "web_search" => Some(ToolCall::WebSearch { query: arg_str("query")? }),
        "memory_search" => {
            if let Some(queries) = arguments.get("queries").and_then(Value::as_array) {
                let queries = queries.iter().filter_map(Value::as_str).map(str::to_string).collect::<Vec<_>>();
                if queries.is_empty() {
                    return None;
                }
                Some(ToolCall::MemorySearch { queries })
            } else {
                Some(ToolCall::MemorySearch { queries: vec![arg_str("query")?] })
            }
        }
        "read_cartography" => Some(ToolCall::ReadCartography),
        "read_file" => Some(ToolCall::ReadFile { filename: arg_str("filename")? }),
        "update_system_summary" => Some(ToolCall::UpdateSystemSummary { content: arg_str("content")? }),
        "final_answer" => Some(ToolCall::FinalAnswer { content: arg_str("content")? }),
        _ => None,
    }
}

/// Maps either vocabulary to the canonical internal (English) name.
fn normalize_function_name(function: &str) -> &str {
    match function {
        "recherche_web" => "web_search",
        "rechercher_memoire" => "memory_search",
        "lire_cartographie" => "read_cartography",
        "lire_fichier" => "read_file",
        other => other,
    }
}

fn parse_plan_update(value: &Value) -> Option<ExecutionPlan> {
    let object = value.as_object()?;
    let global_objective = object.get("global_objective").and_then(Value::as_str)?.to_string();
    let steps = object
        .get("steps")
        .and_then(Value::as_array)
        .map(|steps| steps.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    Some(ExecutionPlan { global_objective, steps })
}
