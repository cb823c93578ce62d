use serde_json::json;

use super::common::*;
use crate::engine::context::{normalize, BillingContext, NormalizedContext};
use crate::engine::criteria::{all_hold, Criterion, Operator};

fn context() -> NormalizedContext {
    normalize(
        &BillingContext::new(wednesday(), 1500.0)
            .with_attribute("Insurer", "  Sanitas Plus ")
            .with_attribute("procedure_code", "CX-204")
            .with_attribute("age", "42")
            .with_attribute("sessions", 3),
    )
}

#[test]
fn normalizer_derives_weekday_and_lowercases_strings() {
    let raw = BillingContext::new(wednesday(), 10.0).with_attribute("Specialty", "Cardiology");
    let normalized = normalize(&raw);

    assert_eq!(normalized.text("weekday").as_deref(), Some("wednesday"));
    assert_eq!(normalized.text("specialty").as_deref(), Some("cardiology"));
    assert_eq!(raw.attributes.get("Specialty"), Some(&json!("Cardiology")));
}

#[test]
fn normalizer_keeps_explicit_weekday() {
    let raw = BillingContext::new(wednesday(), 10.0).with_attribute("weekday", "SUNDAY");
    let normalized = normalize(&raw);

    assert_eq!(normalized.text("weekday").as_deref(), Some("sunday"));
    assert_eq!(normalized.weekday(), Some(chrono::Weekday::Sun));
}

#[test]
fn normalizer_tolerates_missing_date() {
    let raw = BillingContext {
        event_date: None,
        ..BillingContext::new(wednesday(), 10.0)
    };
    let normalized = normalize(&raw);
    assert!(normalized.text("weekday").is_none());
}

#[test]
fn eq_matches_normalized_strings_and_numbers() {
    let ctx = context();
    assert!(Criterion::new("insurer", Operator::Eq, "Sanitas Plus").evaluate(&ctx));
    assert!(Criterion::new("age", Operator::Eq, 42).evaluate(&ctx));
    assert!(Criterion::new("sessions", Operator::Eq, "3").evaluate(&ctx));
    assert!(!Criterion::new("insurer", Operator::Eq, "Sanitas").evaluate(&ctx));
}

#[test]
fn in_requires_membership() {
    let ctx = context();
    assert!(Criterion::new("procedure_code", Operator::In, json!(["cx-100", "CX-204"])).evaluate(&ctx));
    assert!(!Criterion::new("procedure_code", Operator::In, json!(["cx-100"])).evaluate(&ctx));
    assert!(!Criterion::new("procedure_code", Operator::In, "cx-204").evaluate(&ctx));
}

#[test]
fn like_is_case_insensitive_substring() {
    let ctx = context();
    assert!(Criterion::new("insurer", Operator::Like, "SANITAS").evaluate(&ctx));
    assert!(!Criterion::new("insurer", Operator::Like, "mapfre").evaluate(&ctx));
}

#[test]
fn numeric_comparisons_coerce_strings() {
    let ctx = context();
    assert!(Criterion::new("age", Operator::Gte, 42).evaluate(&ctx));
    assert!(Criterion::new("age", Operator::Lte, "50").evaluate(&ctx));
    assert!(!Criterion::new("age", Operator::Gte, 43).evaluate(&ctx));
    assert!(Criterion::new("base_amount", Operator::Gte, 1000).evaluate(&ctx));
    assert!(!Criterion::new("insurer", Operator::Gte, 1).evaluate(&ctx));
}

#[test]
fn between_is_closed_interval() {
    let ctx = context();
    assert!(Criterion::new("sessions", Operator::Between, json!([1, 3])).evaluate(&ctx));
    assert!(Criterion::new("sessions", Operator::Between, json!([3, 5])).evaluate(&ctx));
    assert!(!Criterion::new("sessions", Operator::Between, json!([4, 5])).evaluate(&ctx));
    assert!(!Criterion::new("sessions", Operator::Between, json!([1])).evaluate(&ctx));
}

#[test]
fn regex_matches_case_insensitively() {
    let ctx = context();
    assert!(Criterion::new("procedure_code", Operator::Regex, "^CX-2\\d+$").evaluate(&ctx));
    assert!(!Criterion::new("procedure_code", Operator::Regex, "^ab").evaluate(&ctx));
}

#[test]
fn malformed_criteria_fail_closed() {
    let ctx = context();
    assert!(!Criterion::new("missing", Operator::Eq, "x").evaluate(&ctx));
    assert!(!Criterion::new("procedure_code", Operator::Regex, "([unclosed").evaluate(&ctx));
    assert!(!Criterion::new("age", Operator::Unknown("approx".to_string()), 42).evaluate(&ctx));
}

#[test]
fn unknown_operator_survives_deserialization() {
    let criterion: Criterion =
        serde_json::from_value(json!({"field": "age", "operator": "approx", "value": 42}))
            .expect("criterion parses");
    assert_eq!(criterion.operator, Operator::Unknown("approx".to_string()));
    assert!(!criterion.evaluate(&context()));

    let known: Criterion =
        serde_json::from_value(json!({"field": "age", "operator": "GTE", "value": 40}))
            .expect("criterion parses");
    assert_eq!(known.operator, Operator::Gte);
}

#[test]
fn empty_criteria_always_hold() {
    assert!(all_hold(&[], &context()));
}
