//! Intent classification (spec.md §4.C11 step 3, §3 `Intent`): a small
//! LLM call requesting a `{subject, action, category}` JSON object, with
//! a deterministic keyword-heuristic fallback whenever the call fails
//! or the response can't be parsed — the classifier must never block
//! the turn on a flaky small model.

use mnemos_core::prelude::{ActionEnum, CategoryEnum, Intent, SubjectEnum};
use mnemos_llm::CompletionClient;
use std::sync::Arc;

/// Builds the small-model classification prompt (spec.md §4.C11 step 3).
fn classification_prompt(prompt: &str) -> String {
    format!(
        "Classify the following user message. Respond with a single JSON object only, \
         with exactly these keys: \"subject\" (code|memory|project|conversation|system), \
         \"action\" (explain|generate|fix|search|plan|review), \"category\" \
         (analyse|code|agent|plan|general).\n\nMessage: {prompt}"
    )
}

/// Classifies `prompt`, preferring the small model's JSON verdict and
/// falling back to `SubjectEnum`/`ActionEnum`/`CategoryEnum::from_text`
/// keyword matching run directly over `prompt` on any failure.
pub async fn classify(client: &Arc<dyn CompletionClient>, prompt: &str) -> Intent {
    match classify_via_llm(client, prompt).await {
        Some(intent) => intent,
        None => classify_via_heuristic(prompt),
    }
}

async fn classify_via_llm(client: &Arc<dyn CompletionClient>, prompt: &str) -> Option<Intent> {
    let raw = client.generate(&classification_prompt(prompt)).await.ok()?;
    let object = mnemos_core::prelude::extract_json_object(&raw);
    let subject = object.get("subject")?.as_str()?;
    let action = object.get("action")?.as_str()?;
    let category = object.get("category")?.as_str()?;
    Some(Intent::new(prompt, SubjectEnum::from_text(subject), ActionEnum::from_text(action), CategoryEnum::from_text(category)))
}

fn classify_via_heuristic(prompt: &str) -> Intent {
    Intent::new(prompt, SubjectEnum::from_text(prompt), ActionEnum::from_text(prompt), CategoryEnum::from_text(prompt))
}
