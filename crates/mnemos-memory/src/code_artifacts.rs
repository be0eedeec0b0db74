//! `save_code_artifacts` (spec.md §4.C5): filters out tool-call JSON
//! blocks and archives the rest to `code/code_extraits/` plus one
//! normalised line in the code-chunks journal
//! (DESIGN.md Open Question #3: `code_extraits`, not `dossier_extraits`).

use mnemos_config::PathRegistry;
use mnemos_core::prelude::{CodeArtifact, MnemosError};
use std::collections::HashMap;
use std::io::Write;

/// Extension resolved from `language`, with a `txt` fallback
/// (spec.md §4.C5: "extension resolved via config map with `txt`
/// fallback").
#[must_use]
pub fn resolve_extension(language: &str, extension_map: &HashMap<String, String>) -> String {
    extension_map.get(&language.to_lowercase()).cloned().unwrap_or_else(|| "txt".to_string())
}

/// A block is a tool call, not a durable artefact, if its content parses
/// as JSON and the object carries both a `"function"` and an
/// `"arguments"` key (spec.md §4.C5).
#[must_use]
pub fn is_tool_call_json(content: &str) -> bool {
    match serde_json::from_str::<serde_json::Value>(content.trim()) {
        Ok(serde_json::Value::Object(map)) => map.contains_key("function") && map.contains_key("arguments"),
        _ => false,
    }
}

/// Filters and archives a batch of candidate code artifacts. Returns the
/// artifacts that were actually archived (tool-call blocks are dropped).
pub fn save_code_artifacts(paths: &PathRegistry, extension_map: &HashMap<String, String>, artifacts: Vec<CodeArtifact>) -> Result<Vec<CodeArtifact>, MnemosError> {
    std::fs::create_dir_all(paths.code_extraits())?;
    let journal_path = paths.code().join("code_chunks.jsonl");
    std::fs::create_dir_all(paths.code())?;
    let mut journal = std::fs::OpenOptions::new().create(true).append(true).open(&journal_path)?;

    let mut archived = Vec::new();
    for artifact in artifacts {
        if is_tool_call_json(&artifact.content) {
            tracing::debug!(id = %artifact.id, "skipping tool-call JSON block, not archiving as code artifact");
            continue;
        }

        let ext = resolve_extension(&artifact.language, extension_map);
        let filename = format!("artifact_{}_{}.{ext}", artifact.timestamp.format("%Y%m%d"), artifact.id);
        std::fs::write(paths.code_extraits().join(&filename), &artifact.content)?;

        let record = serde_json::to_string(&artifact)?;
        writeln!(journal, "{record}")?;

        archived.push(artifact);
    }
    journal.flush()?;
    Ok(archived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemos_core::prelude::CodeAnalysis;

    fn artifact(id: &str, language: &str, content: &str) -> CodeArtifact {
        CodeArtifact { id: id.to_string(), hash: "h".to_string(), language: language.to_string(), content: content.to_string(), timestamp: chrono::Utc::now(), analysis: CodeAnalysis::default(), kind: "snippet".to_string() }
    }

    #[test]
    fn tool_call_blocks_are_detected() {
        assert!(is_tool_call_json(r#"{"function": "final_answer", "arguments": {}}"#));
        assert!(!is_tool_call_json(r#"{"function": "final_answer"}"#));
        assert!(!is_tool_call_json("def foo(): pass"));
    }

    #[test]
    fn extension_falls_back_to_txt() {
        let map = HashMap::from([("python".to_string(), "py".to_string())]);
        assert_eq!(resolve_extension("python", &map), "py");
        assert_eq!(resolve_extension("brainfuck", &map), "txt");
    }

    #[test]
    fn tool_call_json_is_filtered_out_of_the_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = PathRegistry::new(tmp.path());
        let map = HashMap::from([("python".to_string(), "py".to_string())]);

        let artifacts = vec![
            artifact("a1", "python", "def foo():\n    return 1\n"),
            artifact("a2", "json", r#"{"function": "read_file", "arguments": {"filename": "x.py"}}"#),
        ];
        let archived = save_code_artifacts(&paths, &map, artifacts).unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].id, "a1");
        assert!(paths.code_extraits().join(format!("artifact_{}_a1.py", chrono::Utc::now().format("%Y%m%d"))).is_file());
    }
}
