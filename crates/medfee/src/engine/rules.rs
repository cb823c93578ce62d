use std::fmt;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::criteria::{Criterion, Operator};

/// Identifier wrapper for payment rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A declarative record mapping targeting conditions to a payment formula.
///
/// Rules are owned by the external rule-management system and are read-only
/// to the engine. Construct them through [`Rule::validate`] (or a
/// [`super::repository::RuleRepository`]) so malformed records are rejected
/// before evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub code: String,
    pub name: String,
    pub valid_from: NaiveDate,
    #[serde(default)]
    pub valid_to: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Lower values win under the priority policy.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub created_on: Option<NaiveDate>,
    pub payment: PaymentModel,
    pub targeting: Targeting,
}

fn default_active() -> bool {
    true
}

impl Rule {
    /// True when `date` falls inside `[valid_from, valid_to]`, open-ended when `valid_to` is unset.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && self.valid_to.map(|end| date <= end).unwrap_or(true)
    }

    /// Whether the validity windows of two rules share at least one day.
    pub fn overlaps(&self, other: &Rule) -> bool {
        let starts_before_other_ends = other
            .valid_to
            .map(|end| self.valid_from <= end)
            .unwrap_or(true);
        let other_starts_before_end = self
            .valid_to
            .map(|end| other.valid_from <= end)
            .unwrap_or(true);
        starts_before_other_ends && other_starts_before_end
    }

    pub fn dimensions(&self) -> Option<&DimensionTargeting> {
        match &self.targeting {
            Targeting::Dimensions(targeting) => Some(targeting),
            Targeting::Criteria(_) => None,
        }
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.code, self.name)
    }

    pub fn validate(&self) -> Result<(), RuleValidationError> {
        let fail = |problem: RuleProblem| RuleValidationError {
            rule_id: self.id.clone(),
            problem,
        };

        if self.id.0.trim().is_empty() {
            return Err(fail(RuleProblem::BlankIdentifier));
        }

        if let Some(end) = self.valid_to {
            if end < self.valid_from {
                return Err(fail(RuleProblem::InvertedValidity {
                    from: self.valid_from,
                    to: end,
                }));
            }
        }

        self.payment.validate().map_err(fail)?;

        if let Targeting::Criteria(targeting) = &self.targeting {
            for criterion in targeting
                .criteria
                .iter()
                .chain(targeting.bonuses.iter().flat_map(|bonus| bonus.criteria.iter()))
            {
                check_criterion(criterion).map_err(fail)?;
            }
            for bonus in &targeting.bonuses {
                if !bonus.percentage.is_finite() {
                    return Err(fail(RuleProblem::NonFiniteParameter("bonus percentage")));
                }
            }
        }

        Ok(())
    }
}

fn check_criterion(criterion: &Criterion) -> Result<(), RuleProblem> {
    if criterion.field.trim().is_empty() {
        return Err(RuleProblem::BlankCriterionField);
    }
    if criterion.operator == Operator::Between {
        let arity = criterion.value.as_array().map(Vec::len).unwrap_or(0);
        if arity != 2 {
            return Err(RuleProblem::BetweenArity {
                field: criterion.field.clone(),
                found: arity,
            });
        }
    }
    Ok(())
}

/// Targeting conditions, in one of the two supported shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Targeting {
    Dimensions(DimensionTargeting),
    Criteria(CriteriaTargeting),
}

/// Discrete dimensions; an unset dimension applies to every value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionTargeting {
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub specialty_id: Option<String>,
    #[serde(default)]
    pub society_id: Option<String>,
    #[serde(default)]
    pub schedule_type: Option<String>,
    #[serde(default)]
    pub applicable_days: Vec<Weekday>,
    #[serde(default)]
    pub participation: Option<ParticipationType>,
}

impl DimensionTargeting {
    /// Schedule restriction, treating `"all"` as no restriction.
    pub fn schedule_constraint(&self) -> Option<&str> {
        self.schedule_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("all"))
    }

    pub fn restricts_days(&self) -> bool {
        !self.applicable_days.is_empty()
    }

    pub fn distinct_days(&self) -> Vec<Weekday> {
        let mut days = Vec::with_capacity(7);
        for day in &self.applicable_days {
            if !days.contains(day) {
                days.push(*day);
            }
        }
        days
    }
}

/// Generic key/operator/value criteria plus stackable bonuses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriteriaTargeting {
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub bonuses: Vec<BonusRule>,
}

/// Additive percentage applied on top of the winning convention when its own criteria hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusRule {
    pub name: String,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationType {
    Individual,
    Society,
    Mixed,
}

impl ParticipationType {
    pub const fn label(self) -> &'static str {
        match self {
            ParticipationType::Individual => "individual",
            ParticipationType::Society => "society",
            ParticipationType::Mixed => "mixed",
        }
    }
}

/// Targeting dimensions referenced by scoring, explanations, and the auditor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Doctor,
    Service,
    Participation,
    Schedule,
    Weekdays,
    Society,
    Recency,
}

impl Dimension {
    pub const fn label(self) -> &'static str {
        match self {
            Dimension::Doctor => "doctor",
            Dimension::Service => "service",
            Dimension::Participation => "participation type",
            Dimension::Schedule => "schedule type",
            Dimension::Weekdays => "applicable days",
            Dimension::Society => "society",
            Dimension::Recency => "recency",
        }
    }
}

/// Payment formula attached to a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum PaymentModel {
    Fixed {
        amount: f64,
    },
    Percentage {
        percentage: f64,
    },
    Factor {
        factor: f64,
    },
    PercentagePlusFixed {
        percentage: f64,
        fixed: f64,
    },
    /// Flat banding: the single matching band's percentage applies to the whole amount.
    TieredByAmount {
        bands: Vec<PercentageBand>,
        fallback_percentage: f64,
    },
    /// Flat banding keyed on the transaction count.
    TieredByQuantity {
        bands: Vec<PercentageBand>,
        fallback_percentage: f64,
    },
    /// Progressive banding: each band's rate applies only to the portion inside it.
    CumulativeBanded {
        bands: Vec<CumulativeBand>,
    },
    DirectTable {
        bands: Vec<ValueBand>,
    },
}

impl PaymentModel {
    pub const fn label(&self) -> &'static str {
        match self {
            PaymentModel::Fixed { .. } => "fixed",
            PaymentModel::Percentage { .. } => "percentage",
            PaymentModel::Factor { .. } => "factor",
            PaymentModel::PercentagePlusFixed { .. } => "percentage plus fixed",
            PaymentModel::TieredByAmount { .. } => "tiered by amount",
            PaymentModel::TieredByQuantity { .. } => "tiered by quantity",
            PaymentModel::CumulativeBanded { .. } => "cumulative banded",
            PaymentModel::DirectTable { .. } => "direct table",
        }
    }

    fn validate(&self) -> Result<(), RuleProblem> {
        match self {
            PaymentModel::Fixed { amount } => finite(*amount, "fixed amount"),
            PaymentModel::Percentage { percentage } => finite(*percentage, "percentage"),
            PaymentModel::Factor { factor } => finite(*factor, "factor"),
            PaymentModel::PercentagePlusFixed { percentage, fixed } => {
                finite(*percentage, "percentage")?;
                finite(*fixed, "fixed amount")
            }
            PaymentModel::TieredByAmount {
                bands,
                fallback_percentage,
            }
            | PaymentModel::TieredByQuantity {
                bands,
                fallback_percentage,
            } => {
                finite(*fallback_percentage, "fallback percentage")?;
                for band in bands {
                    finite(band.percentage, "band percentage")?;
                }
                check_bands(bands)
            }
            PaymentModel::CumulativeBanded { bands } => {
                for band in bands {
                    finite(band.rate.value(), "band rate")?;
                }
                check_bands(bands)
            }
            PaymentModel::DirectTable { bands } => {
                for band in bands {
                    finite(band.amount, "band amount")?;
                }
                check_bands(bands)
            }
        }
    }
}

fn finite(value: f64, name: &'static str) -> Result<(), RuleProblem> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RuleProblem::NonFiniteParameter(name))
    }
}

/// Half-open `[from, to)` range shared by every band table; `to = None` is unbounded.
pub trait Banded {
    fn lower(&self) -> f64;
    fn upper(&self) -> Option<f64>;

    fn contains(&self, value: f64) -> bool {
        value >= self.lower() && self.upper().map(|upper| value < upper).unwrap_or(true)
    }
}

fn check_bands<B: Banded>(bands: &[B]) -> Result<(), RuleProblem> {
    if bands.is_empty() {
        return Err(RuleProblem::EmptyBands);
    }

    let mut previous_end: Option<f64> = None;
    for (index, band) in bands.iter().enumerate() {
        let from = band.lower();
        if !from.is_finite() || from < 0.0 {
            return Err(RuleProblem::InvalidBand { index });
        }
        if let Some(to) = band.upper() {
            if !to.is_finite() || to <= from {
                return Err(RuleProblem::InvalidBand { index });
            }
        }
        if index > 0 {
            match previous_end {
                Some(end) if from >= end => {}
                _ => return Err(RuleProblem::UnorderedBands { index }),
            }
        }
        previous_end = band.upper();
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentageBand {
    pub from: f64,
    #[serde(default)]
    pub to: Option<f64>,
    pub percentage: f64,
}

impl Banded for PercentageBand {
    fn lower(&self) -> f64 {
        self.from
    }

    fn upper(&self) -> Option<f64> {
        self.to
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeBand {
    pub from: f64,
    #[serde(default)]
    pub to: Option<f64>,
    pub rate: BandRate,
}

impl Banded for CumulativeBand {
    fn lower(&self) -> f64 {
        self.from
    }

    fn upper(&self) -> Option<f64> {
        self.to
    }
}

/// Rate applied by a progressive band to the portion of the amount it consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BandRate {
    Percentage(f64),
    /// Added once whenever the band consumes any portion of the amount.
    Fixed(f64),
}

impl BandRate {
    pub fn value(self) -> f64 {
        match self {
            BandRate::Percentage(value) | BandRate::Fixed(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueBand {
    pub from: f64,
    #[serde(default)]
    pub to: Option<f64>,
    pub amount: f64,
}

impl Banded for ValueBand {
    fn lower(&self) -> f64 {
        self.from
    }

    fn upper(&self) -> Option<f64> {
        self.to
    }
}

/// Raised at the repository boundary when a persisted rule is structurally invalid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("rule {rule_id} is invalid: {problem}")]
pub struct RuleValidationError {
    pub rule_id: RuleId,
    pub problem: RuleProblem,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleProblem {
    #[error("identifier is blank")]
    BlankIdentifier,
    #[error("validity window ends ({to}) before it starts ({from})")]
    InvertedValidity { from: NaiveDate, to: NaiveDate },
    #[error("{0} must be a finite number")]
    NonFiniteParameter(&'static str),
    #[error("band table is empty")]
    EmptyBands,
    #[error("band {index} has an invalid range")]
    InvalidBand { index: usize },
    #[error("band {index} overlaps or precedes the previous band")]
    UnorderedBands { index: usize },
    #[error("criterion field is blank")]
    BlankCriterionField,
    #[error("criterion on '{field}' uses between with {found} operand(s); expected 2")]
    BetweenArity { field: String, found: usize },
}
