//! `ExecutionPlan` (spec.md §3): carried across turns for autonomous modes.

use super::prompt::ExecutionPlanRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub global_objective: String,
    pub steps: Vec<String>,
}

impl ExecutionPlan {
    #[must_use]
    pub fn new(global_objective: impl Into<String>) -> Self {
        Self { global_objective: global_objective.into(), steps: Vec::new() }
    }

    /// Replace the plan from a tool-loop `plan_update` payload
    /// (spec.md §6: "a `plan_update` field, when present, replaces the
    /// session's `ExecutionPlan`").
    pub fn replace_from(&mut self, other: ExecutionPlan) {
        *self = other;
    }

    #[must_use]
    pub fn as_ref_type(&self) -> ExecutionPlanRef {
        ExecutionPlanRef { global_objective: self.global_objective.clone(), steps: self.steps.clone() }
    }
}
