use serde::{Deserialize, Serialize};

use super::applicability::ExclusionReason;
use super::resolver::ResolutionPolicy;
use super::rules::RuleId;

/// One recorded stage of an evaluation, returned with every decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum DecisionStep {
    Normalized {
        weekday: Option<String>,
        attributes: usize,
    },
    Excluded {
        rule_id: RuleId,
        reason: ExclusionReason,
    },
    Scored {
        rule_id: RuleId,
        score: f64,
    },
    Ranked {
        policy: ResolutionPolicy,
        order: Vec<RuleId>,
    },
    Calculated {
        rule_id: RuleId,
        amount: f64,
    },
    BonusApplied {
        rule_id: RuleId,
        bonus: String,
        amount: f64,
    },
}

/// Append-only recorder threaded through the pipeline.
#[derive(Debug, Default)]
pub(crate) struct DecisionTrace {
    steps: Vec<DecisionStep>,
}

impl DecisionTrace {
    pub(crate) fn record(&mut self, step: DecisionStep) {
        self.steps.push(step);
    }

    pub(crate) fn into_steps(self) -> Vec<DecisionStep> {
        self.steps
    }
}
