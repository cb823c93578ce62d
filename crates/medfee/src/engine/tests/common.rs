use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::engine::context::BillingContext;
use crate::engine::criteria::Criterion;
use crate::engine::rules::{
    CriteriaTargeting, DimensionTargeting, PaymentModel, Rule, RuleId, Targeting,
};
use crate::engine::PaymentEngine;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// 2025-03-05 falls on a Wednesday.
pub(super) fn wednesday() -> NaiveDate {
    date(2025, 3, 5)
}

/// 2025-03-08 falls on a Saturday.
pub(super) fn saturday() -> NaiveDate {
    date(2025, 3, 8)
}

pub(super) fn engine() -> PaymentEngine {
    PaymentEngine::new(EngineConfig::default())
}

pub(super) fn fixed(amount: f64) -> PaymentModel {
    PaymentModel::Fixed { amount }
}

pub(super) fn percentage(percentage: f64) -> PaymentModel {
    PaymentModel::Percentage { percentage }
}

pub(super) fn dimension_rule(id: &str, targeting: DimensionTargeting, payment: PaymentModel) -> Rule {
    Rule {
        id: RuleId(id.to_string()),
        code: id.to_uppercase(),
        name: format!("Rule {id}"),
        valid_from: date(2024, 1, 1),
        valid_to: None,
        active: true,
        priority: 0,
        created_on: None,
        payment,
        targeting: Targeting::Dimensions(targeting),
    }
}

pub(super) fn criteria_rule(
    id: &str,
    priority: i32,
    criteria: Vec<Criterion>,
    payment: PaymentModel,
) -> Rule {
    Rule {
        priority,
        targeting: Targeting::Criteria(CriteriaTargeting {
            criteria,
            bonuses: Vec::new(),
        }),
        ..dimension_rule(id, DimensionTargeting::default(), payment)
    }
}

pub(super) fn cardiology() -> DimensionTargeting {
    DimensionTargeting {
        specialty_id: Some("Cardiology".to_string()),
        ..DimensionTargeting::default()
    }
}

/// Wednesday cardiology consult by doctor D-7 for service S-1.
pub(super) fn consult_context(base_amount: f64) -> BillingContext {
    BillingContext::new(wednesday(), base_amount)
        .with_attribute("specialty", "CARDIOLOGY")
        .with_attribute("doctor_id", "D-7")
        .with_attribute("service_id", "S-1")
        .with_attribute("schedule_type", "Night")
        .with_attribute("participation_type", "individual")
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
