//! Per-agent stats interceptor (spec.md §9): "Decorator-based method
//! instrumentation becomes an interceptor pattern: every public agent
//! method is wrapped at construction to record `{calls, errors,
//! latency_ms}` ... with an exponential moving average for judge
//! coherence." Grounded on `Metabase/cognitive_logger.py`'s per-agent
//! stat blocks and `tracing`'s span/event instrumentation style.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// A single agent's running counters.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StatsSnapshot {
    pub calls: u64,
    pub errors: u64,
    pub latency_ms_total: f64,
    pub latency_ms_avg: f64,
    pub ema: f64,
}

/// Shared, lock-protected stats block for one agent. Created once at
/// construction and held by reference — matches the "injected,
/// explicitly-owned structures" guidance in spec.md §9 (no global mutable
/// singleton).
pub struct AgentStats {
    name: String,
    inner: Mutex<StatsSnapshot>,
    ema_alpha: f64,
}

impl AgentStats {
    #[must_use]
    pub fn new(name: impl Into<String>, ema_alpha: f64) -> Self {
        Self { name: name.into(), inner: Mutex::new(StatsSnapshot { ema: 1.0, ..Default::default() }), ema_alpha }
    }

    /// Records one call outcome and its wall-clock latency.
    pub fn record(&self, latency: Duration, is_error: bool) {
        let mut snap = self.inner.lock();
        snap.calls += 1;
        if is_error {
            snap.errors += 1;
        }
        snap.latency_ms_total += latency.as_secs_f64() * 1000.0;
        snap.latency_ms_avg = snap.latency_ms_total / snap.calls as f64;
        tracing::debug!(agent = %self.name, calls = snap.calls, errors = snap.errors, latency_ms = latency.as_secs_f64() * 1000.0, "agent call recorded");
    }

    /// Updates the exponential moving average tracked alongside raw
    /// counters (used by the Judge's coherence statistic, spec.md §4.C7
    /// step 5: `ema <- 0.1 * new + 0.9 * ema`).
    pub fn update_ema(&self, new_value: f64) {
        let mut snap = self.inner.lock();
        snap.ema = self.ema_alpha * new_value + (1.0 - self.ema_alpha) * snap.ema;
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        self.inner.lock().clone()
    }

    /// Wraps a fallible call, timing it and recording the outcome.
    pub fn instrument<T, E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let start = Instant::now();
        let result = f();
        self.record(start.elapsed(), result.is_err());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_matches_spec_formula() {
        let stats = AgentStats::new("judge", 0.1);
        stats.update_ema(0.0);
        let snap = stats.snapshot();
        assert!((snap.ema - 0.9).abs() < 1e-9);
    }

    #[test]
    fn instrument_records_errors() {
        let stats = AgentStats::new("retrieval", 0.1);
        let _: Result<(), &str> = stats.instrument(|| Err("boom"));
        let snap = stats.snapshot();
        assert_eq!(snap.calls, 1);
        assert_eq!(snap.errors, 1);
    }
}
