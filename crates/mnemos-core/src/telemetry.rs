//! Structured, per-agent logging (SPEC_FULL.md ambient stack / "Cognitive
//! logger" supplement, grounded on `Metabase/cognitive_logger.py`).
//!
//! `tracing_subscriber` is initialised with an env-filter plus a
//! json or fmt layer depending on `MNEMOS_LOG_FORMAT`, plus one custom
//! layer that stamps every span with
//! `agent = "<name>"` so every log line produced while inside an agent's
//! `tracing::info_span!` carries that tag, even through nested async calls.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output shape, selected via `MNEMOS_LOG_FORMAT` (`json` or `pretty`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var("MNEMOS_LOG_FORMAT").as_deref() {
            Ok("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Initialises the global tracing subscriber. Call once, from
/// `mnemos-runtime`'s `main` or from test harness setup.
///
/// `RUST_LOG` (or `MNEMOS_LOG`, checked first) controls verbosity — a
/// product-specific env var takes precedence over the ecosystem-standard
/// one.
pub fn init_tracing() {
    let filter = std::env::var("MNEMOS_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match LogFormat::from_env() {
        LogFormat::Json => {
            let _ = registry.with(fmt::layer().json().with_target(true).with_current_span(true)).try_init();
        }
        LogFormat::Pretty => {
            let _ = registry.with(fmt::layer().with_target(false)).try_init();
        }
    }
}

/// Opens a span tagged with the owning agent's name, for use at the top of
/// every public agent method (paired with `stats::AgentStats`). Agents in
/// spec.md §4 are named after their component letter, e.g. `"judge"`,
/// `"retrieval"`, `"orchestrator"`.
#[macro_export]
macro_rules! agent_span {
    ($name:expr) => {
        tracing::info_span!("agent_call", agent = $name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!("agent_call", agent = $name, $($field)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_defaults_to_pretty() {
        std::env::remove_var("MNEMOS_LOG_FORMAT");
        assert_eq!(LogFormat::from_env(), LogFormat::Pretty);
    }

    #[test]
    fn log_format_reads_json() {
        std::env::set_var("MNEMOS_LOG_FORMAT", "json");
        assert_eq!(LogFormat::from_env(), LogFormat::Json);
        std::env::remove_var("MNEMOS_LOG_FORMAT");
    }
}
