//! Judge metacognitive drift stat (SPEC_FULL.md supplemented feature),
//! tracking a bounded window of recent coherence scores plus an
//! `echecs_coherence_total` counter. Wraps the generic `AgentStats`
//! interceptor (spec.md §9) rather than replacing it.

use mnemos_core::prelude::AgentStats;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

const RECENT_SCORES_CAP: usize = 100;

/// Per-judge counters: the generic call/EMA block plus a bounded window
/// of raw coherence scores and a running count of coherence failures
/// (verdicts where `valid == false`, not fail-open abstentions).
pub struct JudgeStats {
    agent: AgentStats,
    recent_scores: Mutex<VecDeque<f64>>,
    echecs_coherence_total: AtomicU64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct JudgeStatsSnapshot {
    pub ema: f64,
    pub recent_scores: Vec<f64>,
    pub echecs_coherence_total: u64,
}

impl JudgeStats {
    #[must_use]
    pub fn new(name: impl Into<String>, ema_alpha: f64) -> Self {
        Self { agent: AgentStats::new(name, ema_alpha), recent_scores: Mutex::new(VecDeque::with_capacity(RECENT_SCORES_CAP)), echecs_coherence_total: AtomicU64::new(0) }
    }

    #[must_use]
    pub fn agent(&self) -> &AgentStats {
        &self.agent
    }

    /// Records one coherence verdict: updates the EMA, pushes the raw
    /// score into the bounded recent window, and bumps the failure
    /// counter when the verdict was an actual coherence failure (as
    /// opposed to a fail-open abstention, which is always `valid`).
    pub fn record_coherence(&self, score: f64, is_failure: bool) {
        self.agent.update_ema(score);
        let mut recent = self.recent_scores.lock();
        recent.push_back(score);
        while recent.len() > RECENT_SCORES_CAP {
            recent.pop_front();
        }
        if is_failure {
            self.echecs_coherence_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> JudgeStatsSnapshot {
        JudgeStatsSnapshot {
            ema: self.agent.snapshot().ema,
            recent_scores: self.recent_scores.lock().iter().copied().collect(),
            echecs_coherence_total: self.echecs_coherence_total.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_scores_window_is_capped_at_100() {
        let stats = JudgeStats::new("judge", 0.1);
        for i in 0..150 {
            stats.record_coherence(f64::from(i) / 150.0, false);
        }
        assert_eq!(stats.snapshot().recent_scores.len(), 100);
    }

    #[test]
    fn failure_counter_only_increments_on_real_failures() {
        let stats = JudgeStats::new("judge", 0.1);
        stats.record_coherence(0.9, false);
        stats.record_coherence(0.1, true);
        assert_eq!(stats.snapshot().echecs_coherence_total, 1);
    }
}
