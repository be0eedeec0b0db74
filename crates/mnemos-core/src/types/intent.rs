//! Intent classification types (spec.md §3 `Intent`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the prompt is *about*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectEnum {
    Code,
    Memory,
    Project,
    Conversation,
    System,
    Unknown,
}

/// What the prompt asks the system to *do*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionEnum {
    Explain,
    Generate,
    Fix,
    Search,
    Plan,
    Review,
    Unknown,
}

/// High-level bucket used for rule triggers and memory relevance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryEnum {
    Analyse,
    Code,
    Agent,
    Plan,
    General,
    Unknown,
}

macro_rules! impl_enum_from_text {
    ($ty:ident { $($variant:ident => [$($alias:literal),+ $(,)?]),+ $(,)? } fallback = $fallback:ident) => {
        impl $ty {
            /// Map free text to an enum member. Matching is case-insensitive
            /// and accent-folded; unknown input maps to the declared
            /// fallback member rather than failing (spec.md §3).
            #[must_use]
            pub fn from_text(text: &str) -> Self {
                let folded = fold_accents(&text.to_lowercase());
                $(
                    if [$($alias),+].iter().any(|a| folded.contains(a)) {
                        return Self::$variant;
                    }
                )+
                Self::$fallback
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = match self {
                    $(Self::$variant => stringify!($variant),)+
                };
                write!(f, "{s}")
            }
        }
    };
}

/// Strips the common Latin-1 accented letters down to their ASCII base so
/// that "créer" and "creer" classify identically, as spec.md §3 requires
/// for the subject/action/category mapping.
#[must_use]
pub fn fold_accents(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

impl_enum_from_text!(SubjectEnum {
    Code => ["code", "fonction", "classe", "script", "bug"],
    Memory => ["memoire", "memory", "souvenir"],
    Project => ["projet", "project", "cartograph"],
    Conversation => ["conversation", "chat", "discussion"],
    System => ["systeme", "system", "config"],
} fallback = Unknown);

impl_enum_from_text!(ActionEnum {
    Explain => ["explique", "explain", "comprendre"],
    Generate => ["genere", "generate", "cree", "ecris"],
    Fix => ["corrige", "fix", "repare", "bug"],
    Search => ["cherche", "search", "trouve", "recherche"],
    Plan => ["planifie", "plan", "organise"],
    Review => ["revise", "review", "relis"],
} fallback = Unknown);

impl_enum_from_text!(CategoryEnum {
    Analyse => ["analyse", "analyze", "audit"],
    Code => ["code", "dev", "implementation"],
    Agent => ["agent", "autonomie", "autonomous"],
    Plan => ["plan", "staging", "roadmap"],
    General => ["general", "autre"],
} fallback = Unknown);

/// A classified turn (spec.md §3 `Intent`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub prompt: String,
    pub subject: SubjectEnum,
    pub act: ActionEnum,
    pub category: CategoryEnum,
}

impl Intent {
    /// Build an intent, requiring `prompt` to be non-empty per spec.md §3.
    ///
    /// # Panics
    /// Panics if `prompt` is empty — callers must never construct an
    /// `Intent` from an empty string; `mnemos-orchestrator`'s command gate
    /// guarantees this upstream.
    #[must_use]
    pub fn new(prompt: impl Into<String>, subject: SubjectEnum, act: ActionEnum, category: CategoryEnum) -> Self {
        let prompt = prompt.into();
        assert!(!prompt.is_empty(), "Intent::new requires a non-empty prompt");
        Self { prompt, subject, act, category }
    }

    /// Lower-cased `{subject, action, category}` terms minus the
    /// uninformative `unknown`/`general` members, used by the intent
    /// boost (spec.md §4.C6) and the judge's subject bonus (§4.C7).
    #[must_use]
    pub fn boost_terms(&self) -> Vec<String> {
        [self.subject.to_string(), self.act.to_string(), self.category.to_string()]
            .into_iter()
            .map(|t| t.to_lowercase())
            .filter(|t| t != "unknown" && t != "general")
            .collect()
    }
}
