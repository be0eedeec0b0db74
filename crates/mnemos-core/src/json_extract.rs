//! Robust JSON extraction, centralised per spec.md §9: "Robust JSON
//! parsing is centralised in one utility ... and reused by the judge, the
//! tool-call router, the consolidator, and the reflexor."
//!
//! Grounded on `agent_Juge.py::_extraire_bloc_json` /
//! `_extraire_json_reponse`, redesigned per spec.md §4.C7 to make the
//! bracket counter quote-aware (the original counts every brace; a `}`
//! inside a quoted string value would close the block prematurely).

use serde_json::Value;

/// Scans `text` for the first `{...}` block, walking a bracket counter
/// that ignores characters inside double-quoted strings (respecting `\"`
/// escaping). Returns the substring where the counter returns to zero, or
/// `None` if no balanced block is found.
#[must_use]
pub fn extract_json_block(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = start;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else {
            match c {
                '"' => in_string = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[start..=i]);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Converts noisy LLM output into a JSON object, with the two repair
/// passes spec.md §4.C7 mandates. Never panics; returns an empty object
/// on total failure so callers can fail open.
#[must_use]
pub fn extract_json_object(raw: &str) -> serde_json::Map<String, Value> {
    let Some(block) = extract_json_block(raw) else {
        return serde_json::Map::new();
    };
    let cleaned = block.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    if let Ok(Value::Object(map)) = serde_json::from_str(cleaned) {
        return map;
    }

    // Repair pass (a): double unescaped backslashes except those already
    // part of a valid escape sequence.
    let backslash_fixed = double_unescaped_backslashes(cleaned);
    if let Ok(Value::Object(map)) = serde_json::from_str(&backslash_fixed) {
        return map;
    }

    // Repair pass (b): replace literal newlines with spaces.
    let newline_fixed = backslash_fixed.replace('\n', " ");
    if let Ok(Value::Object(map)) = serde_json::from_str(&newline_fixed) {
        return map;
    }

    serde_json::Map::new()
}

/// Doubles a `\` unless it already starts a valid JSON escape sequence
/// (`\/`, `\u`, `\"`, `\\`, `\b`, `\f`, `\n`, `\r`, `\t`).
fn double_unescaped_backslashes(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            let next = chars.get(i + 1).copied();
            let is_valid_escape = matches!(next, Some('/') | Some('u') | Some('"') | Some('\\') | Some('b') | Some('f') | Some('n') | Some('r') | Some('t'));
            if is_valid_escape {
                out.push(c);
            } else {
                out.push_str("\\\\");
            }
        } else {
            out.push(c);
        }
        i += 1;
    }
    out
}

/// Trailing-`,}` repair used by the tool-call router and the consolidator
/// (spec.md §4.C11, §4.C13) to repair near-JSON before giving up.
#[must_use]
pub fn repair_trailing_comma(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if matches!(chars.get(j), Some('}') | Some(']')) {
                i += 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_balanced_block_ignoring_braces_in_strings() {
        let noisy = r#"chatter {"a": "x}y", "b": 1} trailing"#;
        let block = extract_json_block(noisy).unwrap();
        assert_eq!(block, r#"{"a": "x}y", "b": 1}"#);
    }

    #[test]
    fn no_block_returns_none() {
        assert_eq!(extract_json_block("no braces here"), None);
        assert_eq!(extract_json_block("{ unbalanced"), None);
    }

    #[test]
    fn markdown_fence_is_stripped() {
        let raw = "```json\n{\"reason\": \"ok\", \"score\": 0.9}\n```";
        let map = extract_json_object(raw);
        assert_eq!(map.get("reason").unwrap(), "ok");
    }

    #[test]
    fn backslash_repair_recovers_windows_paths() {
        let raw = r#"{"path": "C:\Users\bob", "score": 1.0}"#;
        let map = extract_json_object(raw);
        assert_eq!(map.get("path").unwrap(), r"C:\Users\bob");
    }

    #[test]
    fn total_failure_yields_empty_map() {
        let map = extract_json_object("not json at all");
        assert!(map.is_empty());
    }

    #[test]
    fn repair_is_idempotent() {
        let once = repair_trailing_comma(r#"{"a": 1, "b": 2,}"#);
        let twice = repair_trailing_comma(&once);
        assert_eq!(once, twice);
        assert_eq!(once, r#"{"a": 1, "b": 2}"#);
    }
}
