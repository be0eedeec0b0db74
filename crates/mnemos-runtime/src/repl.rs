//! Stdin/stdout turn loop driver. The orchestrator itself is transport
//! agnostic (it takes a `StreamSink`, spec.md §4.C9 design notes); this
//! is the thinnest possible transport, matching SPEC_FULL.md's "CLI
//! glue" scope — the Flask/SocketIO front-end the original system uses
//! is explicitly out of scope (spec.md §1).

use mnemos_orchestrator::turn::{SearchMode, StreamSink};
use mnemos_orchestrator::Orchestrator;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

struct StdoutSink;

impl StreamSink for StdoutSink {
    fn on_token(&self, token: &str) {
        print!("{token}");
        let _ = io::stdout().flush();
    }
}

/// Reads one prompt per line from stdin until EOF, feeding each into
/// `Orchestrator::think` and streaming the response to stdout.
/// `web:`/`manual:` prefixes select the non-default search modes so a
/// terminal user can exercise them without a richer front-end.
pub async fn run(orchestrator: Arc<Orchestrator>) {
    let stdin = io::stdin();
    let sink = StdoutSink;
    println!("mnemos is ready. Type a prompt and press enter ('exit' to quit).");

    for line in stdin.lock().lines() {
        let Ok(raw) = line else { break };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            break;
        }

        let (mode, prompt) = parse_search_mode(trimmed);
        print!("\n> ");
        let _ = io::stdout().flush();
        let outcome = orchestrator.think(prompt, true, mode, Some(&sink)).await;
        println!("\n[{} turn, variant={}]", outcome.steps_taken, outcome.prompt_variant);
    }
}

fn parse_search_mode(line: &str) -> (SearchMode, &str) {
    if let Some(rest) = line.strip_prefix("web:") {
        return (SearchMode::Web, rest.trim());
    }
    if let Some(rest) = line.strip_prefix("manual:") {
        return (SearchMode::ManualContext(String::new()), rest.trim());
    }
    (SearchMode::Normal, line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_prompt_uses_normal_mode() {
        let (mode, prompt) = parse_search_mode("what did we discuss yesterday?");
        assert!(matches!(mode, SearchMode::Normal));
        assert_eq!(prompt, "what did we discuss yesterday?");
    }

    #[test]
    fn web_prefix_selects_web_mode_and_strips_prefix() {
        let (mode, prompt) = parse_search_mode("web:  latest rust release notes");
        assert!(matches!(mode, SearchMode::Web));
        assert_eq!(prompt, "latest rust release notes");
    }

    #[test]
    fn manual_prefix_selects_manual_context_mode() {
        let (mode, prompt) = parse_search_mode("manual: summarize this");
        assert!(matches!(mode, SearchMode::ManualContext(_)));
        assert_eq!(prompt, "summarize this");
    }
}
