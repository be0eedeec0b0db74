//! ChatML envelope (spec.md §4.C9): every build ends with
//! `<|im_start|>system ... <|im_end|> <|im_start|>user ... <|im_end|>
//! <|im_start|>assistant\n`, preceded by a `#! PROMPT_TYPE: <Variant>`
//! debug comment.

/// Wraps `system`/`user` sections into the final ChatML string.
#[must_use]
pub fn wrap(variant_name: &str, system: &str, user: &str) -> String {
    format!("#! PROMPT_TYPE: {variant_name}\n<|im_start|>system\n{system}\n<|im_end|>\n<|im_start|>user\n{user}\n<|im_end|>\n<|im_start|>assistant\n")
}

/// Strips the leading `#! PROMPT_TYPE: ...` debug comment, for clients
/// that cannot tolerate a non-ChatML first line.
#[must_use]
pub fn strip_debug_comment(rendered: &str) -> &str {
    match rendered.split_once('\n') {
        Some((first, rest)) if first.starts_with("#!") => rest,
        _ => rendered,
    }
}
