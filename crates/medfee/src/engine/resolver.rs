use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::applicability::Candidate;
use super::context::NormalizedContext;
use super::payment::calculate;
use super::rules::{Rule, Targeting};
use super::specificity::{SpecificityBreakdown, SpecificityScorer};
use crate::config::EngineConfig;

/// Named ordering strategies for picking a winner among candidates.
///
/// Discrete-dimension calculation rules and criteria-based conventions carry
/// different tie-break policies; both are kept explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// Specificity score descending, then reference payout descending, then collection order.
    Specificity,
    /// Explicit priority ascending, then reference payout descending, then collection order.
    Priority,
}

impl ResolutionPolicy {
    /// `Specificity` as soon as any discrete-dimension rule is a candidate.
    pub fn for_candidates(candidates: &[Candidate<'_>]) -> Self {
        let any_dimensional = candidates
            .iter()
            .any(|candidate| matches!(candidate.rule.targeting, Targeting::Dimensions(_)));
        if any_dimensional {
            ResolutionPolicy::Specificity
        } else {
            ResolutionPolicy::Priority
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ResolutionPolicy::Specificity => "specificity",
            ResolutionPolicy::Priority => "priority",
        }
    }
}

/// Candidate annotated with the keys it was ranked by.
#[derive(Debug, Clone)]
pub struct RankedCandidate<'a> {
    pub index: usize,
    pub rule: &'a Rule,
    pub specificity: Option<SpecificityBreakdown>,
    /// Payout at the configured reference base amount.
    pub reference_value: f64,
}

impl RankedCandidate<'_> {
    pub fn score(&self) -> f64 {
        self.specificity
            .as_ref()
            .map(|breakdown| breakdown.total)
            .unwrap_or(0.0)
    }
}

pub struct ConflictResolver<'c> {
    config: &'c EngineConfig,
}

impl<'c> ConflictResolver<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self { config }
    }

    /// Sorts candidates into a deterministic total order; the first entry wins.
    pub fn rank<'a>(
        &self,
        policy: ResolutionPolicy,
        candidates: &[Candidate<'a>],
        context: &NormalizedContext,
    ) -> Vec<RankedCandidate<'a>> {
        let scorer = SpecificityScorer::new(self.config);

        let mut ranked: Vec<RankedCandidate<'a>> = candidates
            .iter()
            .map(|candidate| {
                let specificity = match policy {
                    ResolutionPolicy::Specificity => Some(match &candidate.rule.targeting {
                        Targeting::Dimensions(targeting) => {
                            scorer.score(targeting, candidate.rule.created_on, context)
                        }
                        Targeting::Criteria(_) => SpecificityBreakdown::default(),
                    }),
                    ResolutionPolicy::Priority => None,
                };
                let reference_value = calculate(
                    &candidate.rule.payment,
                    self.config.reference_base_amount,
                    context.quantity,
                )
                .amount;
                RankedCandidate {
                    index: candidate.index,
                    rule: candidate.rule,
                    specificity,
                    reference_value,
                }
            })
            .collect();

        ranked.sort_by(|left, right| compare(policy, left, right));
        ranked
    }
}

fn compare(policy: ResolutionPolicy, left: &RankedCandidate<'_>, right: &RankedCandidate<'_>) -> Ordering {
    let primary = match policy {
        ResolutionPolicy::Specificity => right.score().total_cmp(&left.score()),
        ResolutionPolicy::Priority => left.rule.priority.cmp(&right.rule.priority),
    };
    primary
        .then_with(|| right.reference_value.total_cmp(&left.reference_value))
        .then_with(|| left.index.cmp(&right.index))
}
