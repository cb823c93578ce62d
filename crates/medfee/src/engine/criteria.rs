use std::fmt;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::context::{scalar_text, NormalizedContext};

/// Comparison applied by a [`Criterion`].
///
/// Unrecognised operator names are kept as [`Operator::Unknown`] so a single bad
/// record evaluates false instead of failing the whole rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    In,
    Like,
    Gte,
    Lte,
    Between,
    Regex,
    Unknown(String),
}

impl From<String> for Operator {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "eq" | "=" | "==" => Operator::Eq,
            "in" => Operator::In,
            "like" => Operator::Like,
            "gte" | ">=" => Operator::Gte,
            "lte" | "<=" => Operator::Lte,
            "between" => Operator::Between,
            "regex" => Operator::Regex,
            _ => Operator::Unknown(raw),
        }
    }
}

impl From<Operator> for String {
    fn from(operator: Operator) -> Self {
        operator.to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operator::Eq => "eq",
            Operator::In => "in",
            Operator::Like => "like",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::Between => "between",
            Operator::Regex => "regex",
            Operator::Unknown(raw) => raw.as_str(),
        };
        f.write_str(name)
    }
}

/// One generic predicate `(field, operator, operand)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Criterion {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Fail-closed: a missing field, unknown operator, or failed coercion yields `false`.
    pub fn evaluate(&self, context: &NormalizedContext) -> bool {
        let Some(actual) = context.lookup(&self.field) else {
            return false;
        };

        match &self.operator {
            Operator::Eq => values_equal(&actual, &self.value),
            Operator::In => self
                .value
                .as_array()
                .map(|options| options.iter().any(|option| values_equal(&actual, option)))
                .unwrap_or(false),
            Operator::Like => match (scalar_text(&actual), scalar_text(&self.value)) {
                (Some(haystack), Some(needle)) => haystack
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
                _ => false,
            },
            Operator::Gte => compare(&actual, &self.value, |left, right| left >= right),
            Operator::Lte => compare(&actual, &self.value, |left, right| left <= right),
            Operator::Between => between(&actual, &self.value),
            Operator::Regex => matches_pattern(&actual, &self.value),
            Operator::Unknown(_) => false,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}

/// Context strings are already lower-cased, so string operands are compared the same way.
fn values_equal(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::Number(_) => match (as_number(actual), as_number(expected)) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        },
        Value::Bool(flag) => match actual {
            Value::Bool(other) => other == flag,
            Value::String(text) => text == &flag.to_string(),
            _ => false,
        },
        Value::String(text) => scalar_text(actual)
            .map(|actual| actual == text.trim().to_lowercase())
            .unwrap_or(false),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn compare(actual: &Value, expected: &Value, op: impl Fn(f64, f64) -> bool) -> bool {
    match (as_number(actual), as_number(expected)) {
        (Some(left), Some(right)) => op(left, right),
        _ => false,
    }
}

fn between(actual: &Value, bounds: &Value) -> bool {
    let Some([low, high]) = bounds.as_array().map(Vec::as_slice) else {
        return false;
    };
    match (as_number(actual), as_number(low), as_number(high)) {
        (Some(value), Some(low), Some(high)) => value >= low && value <= high,
        _ => false,
    }
}

fn matches_pattern(actual: &Value, pattern: &Value) -> bool {
    let (Some(text), Some(pattern)) = (scalar_text(actual), pattern.as_str()) else {
        return false;
    };
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(|regex| regex.is_match(&text))
        .unwrap_or(false)
}

/// Logical AND over `criteria`; an empty list always holds.
pub fn all_hold(criteria: &[Criterion], context: &NormalizedContext) -> bool {
    criteria.iter().all(|criterion| criterion.evaluate(context))
}

/// First criterion that does not hold, for exclusion reporting.
pub fn first_failure<'a>(
    criteria: &'a [Criterion],
    context: &NormalizedContext,
) -> Option<&'a Criterion> {
    criteria.iter().find(|criterion| !criterion.evaluate(context))
}
