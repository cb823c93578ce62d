use crate::commands::render_decision;
use crate::infra::parse_date;
use chrono::{NaiveDate, Weekday};
use clap::Args;
use medfee::engine::{
    BandRate, BillingContext, BonusRule, CriteriaTargeting, Criterion, CumulativeBand,
    DimensionTargeting, Operator, PaymentModel, PercentageBand, ReferenceDirectory, ReferenceKind,
    Rule, RuleId, Targeting,
};
use medfee::error::AppError;
use medfee::PaymentEngine;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// First event date of the demo week (YYYY-MM-DD). Defaults to 2025-03-03.
    #[arg(long, value_parser = parse_date)]
    pub(crate) week_of: Option<NaiveDate>,
    /// Base amount billed for each sample event.
    #[arg(long, default_value_t = 700_000.0)]
    pub(crate) base_amount: f64,
}

fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn dimension_rule(
    id: &str,
    name: &str,
    targeting: DimensionTargeting,
    payment: PaymentModel,
) -> Rule {
    Rule {
        id: RuleId(id.to_string()),
        code: id.to_string(),
        name: name.to_string(),
        valid_from: day(2024, 1, 1),
        valid_to: None,
        active: true,
        priority: 0,
        created_on: None,
        payment,
        targeting: Targeting::Dimensions(DimensionTargeting {
            specialty_id: Some("cardiology".to_string()),
            ..targeting
        }),
    }
}

fn convention_rule(id: &str, name: &str, priority: i32, targeting: CriteriaTargeting, payment: PaymentModel) -> Rule {
    Rule {
        priority,
        targeting: Targeting::Criteria(targeting),
        ..dimension_rule(id, name, DimensionTargeting::default(), payment)
    }
}

/// Two cardiology tariffs, a weekend on-call rate and two radiology insurer conventions.
pub(crate) fn sample_rules() -> Vec<Rule> {
    vec![
        dimension_rule(
            "CARD-GEN",
            "Cardiology general",
            DimensionTargeting::default(),
            PaymentModel::Percentage { percentage: 30.0 },
        ),
        dimension_rule(
            "CARD-D7",
            "Cardiology, Dr. Ruiz",
            DimensionTargeting {
                doctor_id: Some("D-7".to_string()),
                ..DimensionTargeting::default()
            },
            PaymentModel::CumulativeBanded {
                bands: vec![
                    CumulativeBand {
                        from: 0.0,
                        to: Some(500_000.0),
                        rate: BandRate::Percentage(10.0),
                    },
                    CumulativeBand {
                        from: 500_000.0,
                        to: None,
                        rate: BandRate::Percentage(20.0),
                    },
                ],
            },
        ),
        dimension_rule(
            "CARD-WKND",
            "Cardiology weekend on-call",
            DimensionTargeting {
                applicable_days: vec![Weekday::Sat, Weekday::Sun],
                ..DimensionTargeting::default()
            },
            PaymentModel::Fixed { amount: 90_000.0 },
        ),
        convention_rule(
            "CONV-ACME",
            "Acme radiology convention",
            1,
            CriteriaTargeting {
                criteria: vec![
                    Criterion::new("specialty", Operator::Eq, "radiology"),
                    Criterion::new("insurer", Operator::Eq, "acme"),
                ],
                bonuses: vec![BonusRule {
                    name: "urgent".to_string(),
                    criteria: vec![Criterion::new("urgency", Operator::Eq, "urgent")],
                    percentage: 10.0,
                }],
            },
            PaymentModel::PercentagePlusFixed {
                percentage: 25.0,
                fixed: 5_000.0,
            },
        ),
        convention_rule(
            "CONV-RAD",
            "Radiology volume convention",
            5,
            CriteriaTargeting {
                criteria: vec![Criterion::new("specialty", Operator::Eq, "radiology")],
                bonuses: Vec::new(),
            },
            PaymentModel::TieredByQuantity {
                bands: vec![
                    PercentageBand {
                        from: 0.0,
                        to: Some(50.0),
                        percentage: 15.0,
                    },
                    PercentageBand {
                        from: 50.0,
                        to: None,
                        percentage: 20.0,
                    },
                ],
                fallback_percentage: 15.0,
            },
        ),
    ]
}

pub(crate) fn sample_reference() -> ReferenceDirectory {
    ReferenceDirectory::default()
        .with(ReferenceKind::Doctor, "D-7", "Dr. Ana Ruiz")
        .with(ReferenceKind::Specialty, "cardiology", "Cardiology")
        .with(ReferenceKind::Specialty, "radiology", "Radiology")
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        week_of,
        base_amount,
    } = args;
    let monday = week_of.unwrap_or_else(|| day(2025, 3, 3));
    let saturday = monday + chrono::Duration::days(5);

    let rules = sample_rules();
    let reference = sample_reference();
    let engine = PaymentEngine::default();

    let events = [
        (
            "Weekday cardiology consult by Dr. Ruiz",
            BillingContext::new(monday, base_amount)
                .with_attribute("specialty", "Cardiology")
                .with_attribute("doctor_id", "D-7"),
        ),
        (
            "Weekend cardiology call by another doctor",
            BillingContext::new(saturday, base_amount)
                .with_attribute("specialty", "Cardiology")
                .with_attribute("doctor_id", "D-2"),
        ),
        (
            "Urgent radiology study for an Acme patient",
            BillingContext::new(monday, base_amount)
                .with_attribute("specialty", "Radiology")
                .with_attribute("insurer", "ACME")
                .with_attribute("urgency", "urgent")
                .with_quantity(64),
        ),
        (
            "Dermatology visit with no tariff",
            BillingContext::new(monday, base_amount).with_attribute("specialty", "dermatology"),
        ),
    ];

    println!("Medical fee demo ({} rules)", rules.len());
    for (title, context) in &events {
        println!("\n== {title}");
        let decision = engine.evaluate_with(context, &rules, &reference)?;
        render_decision(&decision);
    }

    let conflicts = engine.audit_conflicts(&rules);
    println!("\nRule audit: {} conflict(s)", conflicts.len());
    for report in conflicts {
        println!("- {}", report.reason);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medfee::engine::InMemoryRuleRepository;

    #[test]
    fn sample_rules_pass_validation() {
        let repository =
            InMemoryRuleRepository::new(sample_rules()).expect("sample rules are valid");
        assert_eq!(repository.len(), 5);
    }

    #[test]
    fn acme_convention_outranks_volume_convention() {
        let context = BillingContext::new(day(2025, 3, 3), 100_000.0)
            .with_attribute("specialty", "Radiology")
            .with_attribute("insurer", "Acme")
            .with_attribute("urgency", "URGENT");

        let decision = PaymentEngine::default()
            .evaluate_with(&context, &sample_rules(), &sample_reference())
            .expect("evaluation succeeds");

        assert_eq!(
            decision.selected_rule.expect("rule selected").id,
            RuleId("CONV-ACME".to_string())
        );
        assert_eq!(decision.bonuses.len(), 1);
        assert_eq!(decision.amount, 25_000.0 + 5_000.0 + 10_000.0);
    }

    #[test]
    fn demo_runs_end_to_end() {
        run_demo(DemoArgs::default()).expect("demo completes");
    }
}
