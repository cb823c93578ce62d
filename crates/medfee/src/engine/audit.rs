use serde::{Deserialize, Serialize};
use tracing::info;

use super::repository::{RepositoryError, RuleRepository};
use super::rules::{Dimension, DimensionTargeting, Rule, RuleId};

/// Offline finding that two rules target the same events ambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub first: RuleId,
    pub second: RuleId,
    pub shared_dimensions: Vec<Dimension>,
    pub reason: String,
}

/// Pairwise scan over active discrete-dimension rules, in collection order.
///
/// Pairs with different specialties or disjoint validity windows never conflict.
/// Otherwise a pair is flagged when it shares a set value on doctor, service,
/// participation type, or schedule type.
pub fn audit_conflicts(rules: &[Rule]) -> Vec<ConflictReport> {
    let targeted: Vec<(&Rule, &DimensionTargeting)> = rules
        .iter()
        .filter(|rule| rule.active)
        .filter_map(|rule| rule.dimensions().map(|targeting| (rule, targeting)))
        .collect();

    let mut reports = Vec::new();
    for (position, (first, first_targeting)) in targeted.iter().enumerate() {
        for (second, second_targeting) in &targeted[position + 1..] {
            if !same_value(
                first_targeting.specialty_id.as_deref(),
                second_targeting.specialty_id.as_deref(),
            ) || !first.overlaps(second)
            {
                continue;
            }

            let shared = shared_dimensions(first_targeting, second_targeting);
            if shared.is_empty() {
                continue;
            }

            let labels: Vec<&str> = shared.iter().map(|dimension| dimension.label()).collect();
            reports.push(ConflictReport {
                first: first.id.clone(),
                second: second.id.clone(),
                reason: format!(
                    "{} and {} overlap in validity and specialty and both target the same {}",
                    first.label(),
                    second.label(),
                    labels.join(", ")
                ),
                shared_dimensions: shared,
            });
        }
    }

    info!(
        rules = rules.len(),
        conflicts = reports.len(),
        "rule conflict audit finished"
    );
    reports
}

/// Fetches the active collection and audits it; repository errors pass through unchanged.
pub fn audit_repository<R>(repository: &R) -> Result<Vec<ConflictReport>, RepositoryError>
where
    R: RuleRepository + ?Sized,
{
    let rules = repository.active_rules()?;
    Ok(audit_conflicts(&rules))
}

fn shared_dimensions(first: &DimensionTargeting, second: &DimensionTargeting) -> Vec<Dimension> {
    let mut shared = Vec::new();
    if both_set_equal(first.doctor_id.as_deref(), second.doctor_id.as_deref()) {
        shared.push(Dimension::Doctor);
    }
    if both_set_equal(first.service_id.as_deref(), second.service_id.as_deref()) {
        shared.push(Dimension::Service);
    }
    if matches!((first.participation, second.participation), (Some(a), Some(b)) if a == b) {
        shared.push(Dimension::Participation);
    }
    if both_set_equal(first.schedule_constraint(), second.schedule_constraint()) {
        shared.push(Dimension::Schedule);
    }
    shared
}

fn same_value(first: Option<&str>, second: Option<&str>) -> bool {
    match (first, second) {
        (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        (None, None) => true,
        _ => false,
    }
}

fn both_set_equal(first: Option<&str>, second: Option<&str>) -> bool {
    matches!((first, second), (Some(_), Some(_))) && same_value(first, second)
}
