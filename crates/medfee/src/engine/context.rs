use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SPECIALTY: &str = "specialty";
pub const DOCTOR_ID: &str = "doctor_id";
pub const SERVICE_ID: &str = "service_id";
pub const SOCIETY_ID: &str = "society_id";
pub const SCHEDULE_TYPE: &str = "schedule_type";
pub const PARTICIPATION_TYPE: &str = "participation_type";
pub const WEEKDAY: &str = "weekday";

/// Raw billing event as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingContext {
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
    pub base_amount: f64,
    /// Transaction count used by quantity-tiered rules.
    #[serde(default)]
    pub quantity: Option<u64>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl BillingContext {
    pub fn new(event_date: NaiveDate, base_amount: f64) -> Self {
        Self {
            event_date: Some(event_date),
            base_amount,
            quantity: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_quantity(mut self, quantity: u64) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

/// Canonical view of a [`BillingContext`]: keys and categorical strings lower-cased,
/// weekday derived from the event date when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedContext {
    pub event_date: Option<NaiveDate>,
    pub base_amount: f64,
    pub quantity: Option<u64>,
    attributes: BTreeMap<String, Value>,
}

impl NormalizedContext {
    /// Looks up an attribute, falling back to the event's built-in fields.
    pub fn lookup(&self, field: &str) -> Option<Value> {
        let key = field.trim().to_lowercase();
        if let Some(value) = self.attributes.get(&key) {
            return (!value.is_null()).then(|| value.clone());
        }
        match key.as_str() {
            "base_amount" | "amount" => serde_json::Number::from_f64(self.base_amount).map(Value::Number),
            "quantity" => self.quantity.map(Value::from),
            "event_date" | "date" => self
                .event_date
                .map(|date| Value::String(date.format("%Y-%m-%d").to_string())),
            _ => None,
        }
    }

    /// Scalar attribute rendered as text; numbers keep their integer form when integral.
    pub fn text(&self, field: &str) -> Option<String> {
        self.lookup(field).as_ref().and_then(scalar_text)
    }

    pub fn weekday(&self) -> Option<Weekday> {
        self.text(WEEKDAY).and_then(|raw| raw.parse::<Weekday>().ok())
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }
}

/// Pure and total: never fails, never mutates the input.
pub fn normalize(raw: &BillingContext) -> NormalizedContext {
    let mut attributes: BTreeMap<String, Value> = raw
        .attributes
        .iter()
        .map(|(key, value)| (key.trim().to_lowercase(), canonical(value)))
        .collect();

    let has_weekday = attributes
        .get(WEEKDAY)
        .and_then(Value::as_str)
        .map(|value| !value.is_empty())
        .unwrap_or(false);

    if !has_weekday {
        if let Some(date) = raw.event_date {
            attributes.insert(
                WEEKDAY.to_string(),
                Value::String(weekday_name(date.weekday()).to_string()),
            );
        }
    }

    NormalizedContext {
        event_date: raw.event_date,
        base_amount: raw.base_amount,
        quantity: raw.quantity,
        attributes,
    }
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::String(text) => Value::String(text.trim().to_lowercase()),
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(match (number.as_i64(), number.as_f64()) {
            (Some(integer), _) => integer.to_string(),
            (None, Some(float)) if float.fract() == 0.0 && float.abs() < 1e15 => {
                format!("{}", float as i64)
            }
            _ => number.to_string(),
        }),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
