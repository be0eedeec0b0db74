//! The turn loop's command gate (spec.md §4.C11 step 1): a handful of
//! prompts never reach intent classification or retrieval at all —
//! they are recognised verbatim and routed straight to a dedicated
//! handler.

/// Outcome of the command gate. `Normal` carries the trimmed prompt that
/// falls through to the rest of the turn loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// First message of a fresh session (spec.md §4.C9 `NewChat`).
    FirstChat,
    /// `!!!` anywhere in the prompt outside a `#!` debug-comment line
    /// (spec.md §4.C11, §7 "user-signalled misbehaviour").
    Alert,
    /// `+1`/`-1` feedback, with an optional trailing keyword
    /// (spec.md §4.C12).
    Feedback { score: i32, keyword: String },
    Normal(String),
}

const SALUTATIONS: &[&str] = &["bonjour", "salut", "hello", "hi", "hey", "coucou"];

/// Runs the command gate over one raw prompt. `is_first_turn` is the
/// session-level flag (spec.md: first-chat mode triggers on the very
/// first prompt of a session, not on every salutation-looking message).
#[must_use]
pub fn gate(prompt: &str, is_first_turn: bool) -> Command {
    let trimmed = prompt.trim();

    if is_first_turn && is_salutation(trimmed) {
        return Command::FirstChat;
    }

    if has_alert(trimmed) {
        return Command::Alert;
    }

    if let Some(feedback) = parse_feedback(trimmed) {
        return feedback;
    }

    Command::Normal(trimmed.to_string())
}

fn is_salutation(trimmed: &str) -> bool {
    let lower = trimmed.to_lowercase();
    SALUTATIONS.iter().any(|s| lower == *s || lower.starts_with(&format!("{s} ")) || lower.starts_with(&format!("{s},")))
}

/// `!!!` triggers the alert protocol unless it occurs only inside a line
/// that opens with the `#!` debug-comment marker spec.md §4.C9 uses for
/// the prompt-type annotation (so echoing a rendered prompt back never
/// self-triggers the protocol).
fn has_alert(trimmed: &str) -> bool {
    trimmed.lines().any(|line| !line.trim_start().starts_with("#!") && line.contains("!!!"))
}

fn parse_feedback(trimmed: &str) -> Option<Command> {
    let (sign, after_sign) = if let Some(rest) = trimmed.strip_prefix("+1") {
        (1, rest)
    } else if let Some(rest) = trimmed.strip_prefix("-1") {
        (-1, rest)
    } else {
        return None;
    };
    // Require the sign token to stand alone: either nothing follows, or
    // whitespace does — "+123" is a number, not feedback with keyword "23".
    if !after_sign.is_empty() && !after_sign.starts_with(char::is_whitespace) {
        return None;
    }
    let keyword = after_sign.trim();
    let keyword = if keyword.is_empty() { "general".to_string() } else { keyword.to_string() };
    Some(Command::Feedback { score: sign, keyword })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_turn_salutation_triggers_first_chat() {
        assert_eq!(gate("Bonjour !", true), Command::FirstChat);
        assert_eq!(gate("hello there", true), Command::FirstChat);
    }

    #[test]
    fn salutation_on_a_later_turn_is_just_a_normal_prompt() {
        assert_eq!(gate("hello again", false), Command::Normal("hello again".to_string()));
    }

    #[test]
    fn triple_bang_triggers_alert() {
        assert_eq!(gate("this went badly !!!", false), Command::Alert);
    }

    #[test]
    fn triple_bang_inside_a_debug_comment_line_does_not_trigger_alert() {
        assert_eq!(gate("#! PROMPT_TYPE: Standard !!!\nexplain this", false), Command::Normal("#! PROMPT_TYPE: Standard !!!\nexplain this".to_string()));
    }

    #[test]
    fn feedback_with_and_without_keyword() {
        assert_eq!(gate("+1 helpful", false), Command::Feedback { score: 1, keyword: "helpful".to_string() });
        assert_eq!(gate("-1", false), Command::Feedback { score: -1, keyword: "general".to_string() });
    }

    #[test]
    fn plain_prompt_falls_through_as_normal() {
        assert_eq!(gate("explain the retry logic", false), Command::Normal("explain the retry logic".to_string()));
    }
}
