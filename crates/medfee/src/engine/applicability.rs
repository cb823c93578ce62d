use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::context::{weekday_name, NormalizedContext, SPECIALTY, WEEKDAY};
use super::criteria::first_failure;
use super::rules::{DimensionTargeting, Rule, Targeting};

/// A rule that passed the applicability filter, remembering its collection position.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub index: usize,
    pub rule: &'a Rule,
}

/// Why a rule was dropped before ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    Inactive,
    OutsideValidity {
        valid_from: NaiveDate,
        valid_to: Option<NaiveDate>,
    },
    SpecialtyMismatch {
        required: String,
        found: Option<String>,
    },
    WeekdayMismatch {
        allowed: Vec<String>,
        found: Option<String>,
    },
    CriterionFailed {
        criterion: String,
    },
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::Inactive => write!(f, "rule is inactive"),
            ExclusionReason::OutsideValidity {
                valid_from,
                valid_to: Some(valid_to),
            } => write!(f, "event date outside validity {valid_from}..={valid_to}"),
            ExclusionReason::OutsideValidity {
                valid_from,
                valid_to: None,
            } => write!(f, "event date precedes validity start {valid_from}"),
            ExclusionReason::SpecialtyMismatch { required, found } => write!(
                f,
                "specialty {} does not match required {required}",
                found.as_deref().unwrap_or("(none)")
            ),
            ExclusionReason::WeekdayMismatch { allowed, found } => write!(
                f,
                "weekday {} not in [{}]",
                found.as_deref().unwrap_or("(none)"),
                allowed.join(", ")
            ),
            ExclusionReason::CriterionFailed { criterion } => {
                write!(f, "criterion `{criterion}` does not hold")
            }
        }
    }
}

/// Partition of the rule collection into candidates and exclusions, in collection order.
#[derive(Debug, Default)]
pub struct Applicability<'a> {
    pub candidates: Vec<Candidate<'a>>,
    pub excluded: Vec<(&'a Rule, ExclusionReason)>,
}

pub fn filter<'a>(rules: &'a [Rule], context: &NormalizedContext, date: NaiveDate) -> Applicability<'a> {
    let mut outcome = Applicability::default();
    for (index, rule) in rules.iter().enumerate() {
        match check(rule, context, date) {
            Ok(()) => outcome.candidates.push(Candidate { index, rule }),
            Err(reason) => outcome.excluded.push((rule, reason)),
        }
    }
    outcome
}

pub fn check(rule: &Rule, context: &NormalizedContext, date: NaiveDate) -> Result<(), ExclusionReason> {
    if !rule.active {
        return Err(ExclusionReason::Inactive);
    }

    if !rule.covers(date) {
        return Err(ExclusionReason::OutsideValidity {
            valid_from: rule.valid_from,
            valid_to: rule.valid_to,
        });
    }

    match &rule.targeting {
        Targeting::Dimensions(targeting) => check_hard_dimensions(targeting, context),
        Targeting::Criteria(targeting) => match first_failure(&targeting.criteria, context) {
            Some(criterion) => Err(ExclusionReason::CriterionFailed {
                criterion: criterion.to_string(),
            }),
            None => Ok(()),
        },
    }
}

/// Specialty and weekday are authoritative; the remaining dimensions only affect scoring.
fn check_hard_dimensions(
    targeting: &DimensionTargeting,
    context: &NormalizedContext,
) -> Result<(), ExclusionReason> {
    if let Some(required) = targeting.specialty_id.as_deref() {
        let found = context.text(SPECIALTY);
        let matches = found
            .as_deref()
            .map(|value| value == required.trim().to_lowercase())
            .unwrap_or(false);
        if !matches {
            return Err(ExclusionReason::SpecialtyMismatch {
                required: required.to_string(),
                found,
            });
        }
    }

    if targeting.restricts_days() {
        let allowed = targeting.distinct_days();
        let day_matches = context
            .weekday()
            .map(|day| allowed.contains(&day))
            .unwrap_or(false);
        if !day_matches {
            return Err(ExclusionReason::WeekdayMismatch {
                allowed: allowed
                    .iter()
                    .map(|day| weekday_name(*day).to_string())
                    .collect(),
                found: context.text(WEEKDAY),
            });
        }
    }

    Ok(())
}
