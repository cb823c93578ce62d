//! Payment rule selection and calculation.
//!
//! The pipeline is a pure function of a rule-set snapshot and a billing
//! context: normalize → filter → rank → calculate → explain. Nothing here
//! reads a clock, touches storage, or keeps state between calls, so a single
//! [`PaymentEngine`] can be shared freely across request handlers.

pub mod applicability;
pub mod audit;
pub mod context;
pub mod criteria;
pub mod explanation;
pub mod payment;
pub mod reference;
pub mod repository;
pub mod resolver;
pub mod router;
pub mod rules;
pub mod service;
pub mod specificity;
pub mod trace;

#[cfg(test)]
mod tests;

pub use applicability::{Candidate, ExclusionReason};
pub use audit::{audit_conflicts, audit_repository, ConflictReport};
pub use context::{normalize, BillingContext, NormalizedContext};
pub use criteria::{Criterion, Operator};
pub use payment::{AppliedBonus, Calculation};
pub use reference::{NoReferenceData, ReferenceData, ReferenceDirectory, ReferenceKind};
pub use repository::{InMemoryRuleRepository, RepositoryError, RuleRepository};
pub use resolver::ResolutionPolicy;
pub use router::{payment_router, ConflictsResponse, EvaluateRequest};
pub use rules::{
    BandRate, BonusRule, CriteriaTargeting, CumulativeBand, Dimension, DimensionTargeting,
    ParticipationType, PaymentModel, PercentageBand, Rule, RuleId, RuleValidationError, Targeting,
    ValueBand,
};
pub use service::{PaymentService, PaymentServiceError};
pub use specificity::{ScoreComponent, SpecificityBreakdown};
pub use trace::DecisionStep;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use context::WEEKDAY;
use explanation::ExplanationGenerator;
use payment::{calculate, floor_at_zero};
use resolver::{ConflictResolver, RankedCandidate};
use trace::DecisionTrace;

/// Structurally invalid calls, rejected before any matching begins.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("billing context has no event date")]
    MissingEventDate,
    #[error("base amount must be a non-negative number, got {0}")]
    InvalidBaseAmount(f64),
}

/// Identifying fields of a rule as reported in a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub id: RuleId,
    pub code: String,
    pub name: String,
}

impl From<&Rule> for RuleSummary {
    fn from(rule: &Rule) -> Self {
        Self {
            id: rule.id.clone(),
            code: rule.code.clone(),
            name: rule.name.clone(),
        }
    }
}

/// A matching rule that lost the resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeCandidate {
    pub rule: RuleSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specificity: Option<f64>,
    pub priority: i32,
    pub reference_value: f64,
}

/// Engine output for one evaluation. The engine keeps no copy of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub selected_rule: Option<RuleSummary>,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<ResolutionPolicy>,
    pub alternatives: Vec<AlternativeCandidate>,
    pub bonuses: Vec<AppliedBonus>,
    pub explanation: String,
    pub warnings: Vec<String>,
    pub trace: Vec<DecisionStep>,
}

/// Stateless evaluator holding only its tunables.
#[derive(Debug, Clone, Default)]
pub struct PaymentEngine {
    config: EngineConfig,
}

impl PaymentEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluates without reference names; explanations show raw identifiers.
    pub fn evaluate(
        &self,
        context: &BillingContext,
        rules: &[Rule],
    ) -> Result<DecisionResult, EvaluationError> {
        self.evaluate_with(context, rules, &NoReferenceData)
    }

    pub fn evaluate_with(
        &self,
        context: &BillingContext,
        rules: &[Rule],
        reference: &dyn ReferenceData,
    ) -> Result<DecisionResult, EvaluationError> {
        let event_date = context.event_date.ok_or(EvaluationError::MissingEventDate)?;
        if !context.base_amount.is_finite() || context.base_amount < 0.0 {
            return Err(EvaluationError::InvalidBaseAmount(context.base_amount));
        }

        let mut trace = DecisionTrace::default();
        let normalized = normalize(context);
        trace.record(DecisionStep::Normalized {
            weekday: normalized.text(WEEKDAY),
            attributes: normalized.attributes().len(),
        });

        let filtered = applicability::filter(rules, &normalized, event_date);
        for (rule, reason) in &filtered.excluded {
            trace.record(DecisionStep::Excluded {
                rule_id: rule.id.clone(),
                reason: reason.clone(),
            });
        }

        let explainer = ExplanationGenerator::new(reference);

        let mut warnings = Vec::new();
        let policy = ResolutionPolicy::for_candidates(&filtered.candidates);
        let mixed = filtered
            .candidates
            .iter()
            .any(|candidate| matches!(candidate.rule.targeting, Targeting::Criteria(_)))
            && policy == ResolutionPolicy::Specificity;
        if mixed {
            warnings.push(
                "candidates mix discrete-dimension and criteria rules; ranking all by specificity"
                    .to_string(),
            );
        }

        let ranked = ConflictResolver::new(&self.config).rank(
            policy,
            &filtered.candidates,
            &normalized,
        );
        let Some(winner) = ranked.first() else {
            debug!(rules = rules.len(), %event_date, "no applicable payment rule");
            return Ok(DecisionResult {
                selected_rule: None,
                amount: 0.0,
                policy: None,
                alternatives: Vec::new(),
                bonuses: Vec::new(),
                explanation: explainer.no_match(
                    event_date,
                    &normalized,
                    rules.len(),
                    &filtered.excluded,
                ),
                warnings: Vec::new(),
                trace: trace.into_steps(),
            });
        };
        for candidate in &ranked {
            if let Some(breakdown) = &candidate.specificity {
                trace.record(DecisionStep::Scored {
                    rule_id: candidate.rule.id.clone(),
                    score: breakdown.total,
                });
            }
        }
        trace.record(DecisionStep::Ranked {
            policy,
            order: ranked.iter().map(|candidate| candidate.rule.id.clone()).collect(),
        });

        let calculation = calculate(&winner.rule.payment, context.base_amount, context.quantity);
        trace.record(DecisionStep::Calculated {
            rule_id: winner.rule.id.clone(),
            amount: calculation.amount,
        });
        warnings.extend(
            calculation
                .warnings
                .iter()
                .map(|warning| format!("{}: {warning}", winner.rule.id)),
        );
        if let Some(breakdown) = &winner.specificity {
            for dimension in &breakdown.soft_mismatches {
                warnings.push(format!(
                    "{}: selected despite {} not matching the event",
                    winner.rule.id,
                    dimension.label()
                ));
            }
        }

        let bonuses = self.bonuses(winner, &normalized, context.base_amount);
        for bonus in &bonuses {
            trace.record(DecisionStep::BonusApplied {
                rule_id: winner.rule.id.clone(),
                bonus: bonus.name.clone(),
                amount: bonus.amount,
            });
        }
        let amount = floor_at_zero(
            calculation.amount + bonuses.iter().map(|bonus| bonus.amount).sum::<f64>(),
        );

        let explanation = explainer.selected(
            policy,
            &ranked,
            &calculation,
            &bonuses,
            context.base_amount,
            amount,
        );

        debug!(
            rule_id = %winner.rule.id,
            candidates = ranked.len(),
            amount,
            policy = policy.label(),
            "payment rule selected"
        );

        Ok(DecisionResult {
            selected_rule: Some(RuleSummary::from(winner.rule)),
            amount,
            policy: Some(policy),
            alternatives: ranked[1..].iter().map(alternative).collect(),
            bonuses,
            explanation,
            warnings,
            trace: trace.into_steps(),
        })
    }

    pub fn audit_conflicts(&self, rules: &[Rule]) -> Vec<ConflictReport> {
        audit_conflicts(rules)
    }

    fn bonuses(
        &self,
        winner: &RankedCandidate<'_>,
        context: &NormalizedContext,
        base_amount: f64,
    ) -> Vec<AppliedBonus> {
        match &winner.rule.targeting {
            Targeting::Criteria(targeting) => targeting
                .bonuses
                .iter()
                .filter(|bonus| criteria::all_hold(&bonus.criteria, context))
                .map(|bonus| AppliedBonus::new(bonus.name.clone(), bonus.percentage, base_amount))
                .collect(),
            Targeting::Dimensions(_) => Vec::new(),
        }
    }
}

fn alternative(candidate: &RankedCandidate<'_>) -> AlternativeCandidate {
    AlternativeCandidate {
        rule: RuleSummary::from(candidate.rule),
        specificity: candidate.specificity.as_ref().map(|breakdown| breakdown.total),
        priority: candidate.rule.priority,
        reference_value: candidate.reference_value,
    }
}

/// Evaluates `context` against `rules` with default tunables and no reference names.
pub fn evaluate(context: &BillingContext, rules: &[Rule]) -> Result<DecisionResult, EvaluationError> {
    PaymentEngine::default().evaluate(context, rules)
}
