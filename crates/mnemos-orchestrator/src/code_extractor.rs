//! Fenced-code-block extraction (spec.md §4.C11 step 10 "post-
//! processing": code blocks in the response are archived via
//! `save_code_artifacts` and replaced in the persisted response with a
//! placeholder so `historique/`/`brute/` never duplicate what
//! `code/code_extraits/` already holds).

use mnemos_core::prelude::{CodeAnalysis, CodeArtifact};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

const PLACEHOLDER: &str = "[\u{1F4BE} CODE EXTRACTED]";

static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```([A-Za-z0-9_+-]*)\n(.*?)```").expect("fenced-code regex is valid"));

/// One block found in a response.
pub struct ExtractedBlock {
    pub language: String,
    pub content: String,
}

/// Finds every fenced code block in `response`.
#[must_use]
pub fn find_blocks(response: &str) -> Vec<ExtractedBlock> {
    FENCE
        .captures_iter(response)
        .map(|caps| ExtractedBlock {
            language: caps.get(1).map(|m| m.as_str().to_string()).filter(|s| !s.is_empty()).unwrap_or_else(|| "text".to_string()),
            content: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
        .collect()
}

/// Replaces every fenced code block in `response` with the archival
/// placeholder, returning the rewritten text.
#[must_use]
pub fn replace_blocks_with_placeholder(response: &str) -> String {
    FENCE.replace_all(response, PLACEHOLDER).to_string()
}

/// Builds one [`CodeArtifact`] per extracted block, ready for
/// `MemoryManager::save_code_artifacts`.
#[must_use]
pub fn build_artifacts(blocks: &[ExtractedBlock]) -> Vec<CodeArtifact> {
    blocks
        .iter()
        .map(|block| CodeArtifact {
            id: uuid::Uuid::new_v4().to_string(),
            hash: format!("{:x}", md5_like_hash(&block.content)),
            language: block.language.clone(),
            content: block.content.clone(),
            timestamp: chrono::Utc::now(),
            analysis: CodeAnalysis::default(),
            kind: "snippet".to_string(),
        })
        .collect()
}

/// A dependency-free content fingerprint (not a real cryptographic
/// hash — sufficient for deduplicating archived snippets, grounded on
/// the same FNV1a shingle approach `mnemos-vectorstore::HashingEncoder`
/// uses for its deterministic embeddings).
fn md5_like_hash(content: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in content.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

/// Maps each block's language to a file extension, seeding unknown
/// languages with `txt` — mirrors
/// `mnemos_memory::code_artifacts::resolve_extension`'s default.
#[must_use]
pub fn default_extension_map() -> HashMap<String, String> {
    [("python", "py"), ("rust", "rs"), ("javascript", "js"), ("typescript", "ts"), ("json", "json"), ("yaml", "yaml"), ("bash", "sh"), ("sh", "sh")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_language_tagged_and_untagged_blocks() {
        let response = "Here:\n```python\nprint(1)\n```\nand also\n```\nplain\n```";
        let blocks = find_blocks(response);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language, "python");
        assert_eq!(blocks[0].content.trim(), "print(1)");
        assert_eq!(blocks[1].language, "text");
    }

    #[test]
    fn placeholder_replaces_every_block() {
        let response = "a\n```rust\nfn f() {}\n```\nb";
        let replaced = replace_blocks_with_placeholder(response);
        assert!(!replaced.contains("```"));
        assert!(replaced.contains(PLACEHOLDER));
    }

    #[test]
    fn no_blocks_means_no_change() {
        let response = "just a plain answer";
        assert_eq!(replace_blocks_with_placeholder(response), response);
        assert!(find_blocks(response).is_empty());
    }
}
