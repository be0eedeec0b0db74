//! Section formatters (spec.md §4.C9): rules, memories, history,
//! code chunks, and README/tech-doc rendering.

use mnemos_core::prelude::{Atom, AtomFields, CodeChunk};

const MEMORY_WARNING_PREAMBLE: &str =
    "The following memories are condensed summaries, not verbatim transcripts. \
     Call `memory_search` if you need the exact original exchange.";

const CODE_CHUNK_DISCLAIMER: &str =
    "The following code excerpts are previews taken at retrieval time and may be stale. \
     Use `read_file` to fetch current contents before proposing an edit.";

/// Each rule is prefixed "🚨 ALERT" if its title contains `ALERTE`, else
/// "⚠️ Rule" (spec.md §4.C9 "Rules").
#[must_use]
pub fn format_rules(rules: &[Atom]) -> String {
    if rules.is_empty() {
        return String::new();
    }
    let mut out = String::from("### Active Rules\n");
    for rule in rules {
        let prefix = if rule.title().contains("ALERTE") { "🚨 ALERT" } else { "⚠️ Rule" };
        out.push_str(&format!("{prefix} [{}]: {}\n", rule.title(), rule.content()));
    }
    out
}

fn render_memory_fields(fields: &AtomFields) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(&fields.content) {
        if let (Some(timestamp), Some(prompt), Some(response)) = (
            map.get("timestamp").and_then(|v| v.as_str()),
            map.get("prompt").and_then(|v| v.as_str()),
            map.get("response").and_then(|v| v.as_str()),
        ) {
            return format!("[{}] ({:.2}) at {timestamp}\n  user: {prompt}\n  assistant: {response}", fields.title, fields.score);
        }
    }
    format!("[{}] ({:.2}): {}", fields.title, fields.score, fields.content)
}

/// A warning preamble plus one rendered entry per memory (spec.md §4.C9
/// "Memories"): interaction-shaped JSON renders `timestamp/prompt/
/// response`, everything else renders as raw text.
#[must_use]
pub fn format_memories(memories: &[AtomFields]) -> String {
    if memories.is_empty() {
        return String::new();
    }
    let mut out = format!("### Relevant Memory\n{MEMORY_WARNING_PREAMBLE}\n");
    for memory in memories {
        out.push_str(&render_memory_fields(memory));
        out.push('\n');
    }
    out
}

/// Same rendering, for `Atom`-wrapped memories carried through the tool
/// loop (`found_memories` in the `MemorySearch*` variants).
#[must_use]
pub fn format_memory_atoms(atoms: &[Atom]) -> String {
    let fields: Vec<AtomFields> = atoms.iter().map(|a| a.fields().clone()).collect();
    format_memories(&fields)
}

fn strip_role_prefix(line: &str) -> &str {
    line.strip_prefix("user: ").or_else(|| line.strip_prefix("assistant: ")).unwrap_or(line)
}

/// Pairs consecutive strings as `User`/`Assistant`; a trailing orphan
/// (the current prompt, handled separately) is dropped (spec.md §4.C9
/// "History").
#[must_use]
pub fn format_history(history: &[String]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let mut out = String::from("### Recent History\n");
    let mut pairs = history.chunks_exact(2);
    for pair in &mut pairs {
        out.push_str(&format!("User: {}\nAssistant: {}\n", strip_role_prefix(&pair[0]), strip_role_prefix(&pair[1])));
    }
    out
}

/// Each chunk with its `path` header and a fenced block in its language,
/// preceded by a disclaimer (spec.md §4.C9 "CodeChunks").
#[must_use]
pub fn format_code_chunks(chunks: &[CodeChunk]) -> String {
    if chunks.is_empty() {
        return String::new();
    }
    let mut out = format!("### Code Context\n{CODE_CHUNK_DISCLAIMER}\n");
    for chunk in chunks {
        out.push_str(&format!("#### {}\n```{}\n{}\n```\n", chunk.path, chunk.language, chunk.content));
    }
    out
}

/// READMEs and tech docs rendered uniformly, preferring `path` when
/// present, else falling back to the atom's title (spec.md §4.C9
/// "READMEs/TechDocs").
#[must_use]
pub fn format_readmes(readmes: &[Atom]) -> String {
    if readmes.is_empty() {
        return String::new();
    }
    let mut out = String::from("### Documentation\n");
    for atom in readmes {
        let header = match atom {
            Atom::ReadmeFile { path, .. } if !path.is_empty() => path.clone(),
            other => other.title().to_string(),
        };
        out.push_str(&format!("#### {header}\n{}\n", atom.content()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemos_core::prelude::CodeChunkKind;

    #[test]
    fn alerte_titled_rules_get_the_alert_prefix() {
        let rules = vec![Atom::rule("stop", "ALERTE_STOP"), Atom::rule("go slow", "R_PACE")];
        let rendered = format_rules(&rules);
        assert!(rendered.contains("🚨 ALERT [ALERTE_STOP]"));
        assert!(rendered.contains("⚠️ Rule [R_PACE]"));
    }

    #[test]
    fn interaction_shaped_memory_renders_structured_fields() {
        let memory = AtomFields {
            content: r#"{"timestamp": "t1", "prompt": "hi", "response": "hello"}"#.to_string(),
            title: "mem1".to_string(),
            kind: "raw_history".to_string(),
            score: 0.8,
        };
        let rendered = format_memories(&[memory]);
        assert!(rendered.contains("user: hi"));
        assert!(rendered.contains("assistant: hello"));
    }

    #[test]
    fn non_json_memory_renders_raw_text() {
        let memory = AtomFields { content: "plain text".to_string(), title: "mem2".to_string(), kind: "raw_history".to_string(), score: 0.5 };
        let rendered = format_memories(&[memory]);
        assert!(rendered.contains("plain text"));
    }

    #[test]
    fn trailing_orphan_history_entry_is_dropped() {
        let history = vec!["user: a".to_string(), "assistant: b".to_string(), "user: c".to_string()];
        let rendered = format_history(&history);
        assert!(rendered.contains("User: a"));
        assert!(rendered.contains("Assistant: b"));
        assert!(!rendered.contains("User: c"));
    }

    #[test]
    fn code_chunks_render_with_disclaimer_and_fence() {
        let chunks = vec![CodeChunk { content: "fn x() {}".to_string(), path: "a.rs".to_string(), kind: CodeChunkKind::Function, language: "rust".to_string() }];
        let rendered = format_code_chunks(&chunks);
        assert!(rendered.contains("read_file"));
        assert!(rendered.contains("```rust"));
    }

    #[test]
    fn readmes_prefer_path_over_title() {
        let readmes = vec![Atom::readme("content", "README_code.md", "connaissances/README_code.md")];
        let rendered = format_readmes(&readmes);
        assert!(rendered.contains("connaissances/README_code.md"));
    }
}
