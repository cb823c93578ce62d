use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::applicability::ExclusionReason;
use super::context::{NormalizedContext, SPECIALTY, WEEKDAY};
use super::payment::{money, AppliedBonus, Calculation};
use super::reference::ReferenceData;
use super::resolver::{RankedCandidate, ResolutionPolicy};
use super::rules::{Dimension, Rule, Targeting};

/// Renders deterministic, human-readable decision traces.
///
/// All descriptive names come from the injected [`ReferenceData`]; unknown
/// identifiers are printed as-is.
pub struct ExplanationGenerator<'r> {
    reference: &'r dyn ReferenceData,
}

impl<'r> ExplanationGenerator<'r> {
    pub fn new(reference: &'r dyn ReferenceData) -> Self {
        Self { reference }
    }

    /// `ranked[0]` is the winner; the rest are reported as runner-ups.
    pub fn selected(
        &self,
        policy: ResolutionPolicy,
        ranked: &[RankedCandidate<'_>],
        calculation: &Calculation,
        bonuses: &[AppliedBonus],
        base_amount: f64,
        amount: f64,
    ) -> String {
        let Some(winner) = ranked.first() else {
            return String::new();
        };
        let rule = winner.rule;
        let mut lines = vec![format!(
            "Selected rule {} by {} among {} candidate(s).",
            rule.label(),
            policy.label(),
            ranked.len()
        )];

        lines.push(self.targeting_line(winner));

        lines.push(format!(
            "Calculation ({}) on base {}: {}.",
            rule.payment.label(),
            money(base_amount),
            calculation.arithmetic.join("; ")
        ));

        for bonus in bonuses {
            lines.push(format!(
                "Bonus {}: round({} × {}%) = {}.",
                bonus.name,
                money(base_amount),
                bonus.percentage,
                money(bonus.amount)
            ));
        }

        lines.push(format!("Amount payable: {}.", money(amount)));

        if ranked.len() > 1 {
            let others: Vec<String> = ranked[1..]
                .iter()
                .map(|candidate| runner_up(policy, candidate))
                .collect();
            lines.push(format!("Other matching rules: {}.", others.join("; ")));
        }

        lines.join("\n")
    }

    /// Guidance when nothing matched, naming the most likely causes.
    pub fn no_match(
        &self,
        event_date: NaiveDate,
        context: &NormalizedContext,
        evaluated: usize,
        excluded: &[(&Rule, ExclusionReason)],
    ) -> String {
        let specialty = context
            .text(SPECIALTY)
            .map(|id| self.reference.specialty_name(&id).unwrap_or(id))
            .unwrap_or_else(|| "unspecified".to_string());
        let weekday = context
            .text(WEEKDAY)
            .unwrap_or_else(|| "unknown".to_string());

        let mut lines = vec![format!(
            "No applicable rule for the event on {event_date} ({weekday}, specialty {specialty}); {evaluated} rule(s) evaluated."
        )];

        let mut causes: BTreeMap<&'static str, usize> = BTreeMap::new();
        for (_, reason) in excluded {
            *causes.entry(cause_label(reason)).or_default() += 1;
        }
        if !causes.is_empty() {
            let summary: Vec<String> = causes
                .iter()
                .map(|(label, count)| format!("{label}: {count}"))
                .collect();
            lines.push(format!("Exclusions: {}.", summary.join(", ")));
        }

        lines.push(
            "Check that a rule's validity window covers the event date and that its specialty and weekday restrictions match the event."
                .to_string(),
        );
        lines.join("\n")
    }

    fn targeting_line(&self, winner: &RankedCandidate<'_>) -> String {
        match &winner.rule.targeting {
            Targeting::Dimensions(targeting) => {
                let mut parts = Vec::new();
                if let Some(specialty) = &targeting.specialty_id {
                    parts.push(format!(
                        "specialty {}",
                        self.reference
                            .specialty_name(specialty)
                            .unwrap_or_else(|| specialty.clone())
                    ));
                }
                let breakdown = winner.specificity.as_ref();
                for component in breakdown.map(|b| b.components.as_slice()).unwrap_or(&[]) {
                    if component.points <= 0.0 {
                        continue;
                    }
                    let subject = match component.dimension {
                        Dimension::Doctor => targeting
                            .doctor_id
                            .as_deref()
                            .map(|id| self.named(id, self.reference.doctor_name(id), "doctor")),
                        Dimension::Service => targeting
                            .service_id
                            .as_deref()
                            .map(|id| self.named(id, self.reference.service_name(id), "service")),
                        Dimension::Society => targeting
                            .society_id
                            .as_deref()
                            .map(|id| self.named(id, self.reference.society_name(id), "society")),
                        _ => None,
                    }
                    .unwrap_or_else(|| component.notes.clone());
                    parts.push(format!("{subject} (+{})", component.points));
                }

                let score = winner.score();
                let mut line = if parts.is_empty() {
                    format!("Applies generally (score {score:.1}).")
                } else {
                    format!("Specific to {} (score {score:.1}).", parts.join(", "))
                };
                let mismatches: Vec<&str> = breakdown
                    .map(|b| b.soft_mismatches.iter().map(|d| d.label()).collect())
                    .unwrap_or_default();
                if !mismatches.is_empty() {
                    line.push_str(&format!(
                        " Not matching the event on: {}.",
                        mismatches.join(", ")
                    ));
                }
                line
            }
            Targeting::Criteria(targeting) => {
                let criteria: Vec<String> = targeting
                    .criteria
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                if criteria.is_empty() {
                    format!(
                        "Priority {}; no criteria (applies to every event).",
                        winner.rule.priority
                    )
                } else {
                    format!(
                        "Priority {}; criteria held: {}.",
                        winner.rule.priority,
                        criteria.join(" AND ")
                    )
                }
            }
        }
    }

    fn named(&self, id: &str, name: Option<String>, kind: &str) -> String {
        match name {
            Some(name) => format!("{kind} {name}"),
            None => format!("{kind} {id}"),
        }
    }
}

fn runner_up(policy: ResolutionPolicy, candidate: &RankedCandidate<'_>) -> String {
    let key = match policy {
        ResolutionPolicy::Specificity => format!("score {:.1}", candidate.score()),
        ResolutionPolicy::Priority => format!("priority {}", candidate.rule.priority),
    };
    format!(
        "{} {key}, reference value {}",
        candidate.rule.label(),
        money(candidate.reference_value)
    )
}

fn cause_label(reason: &ExclusionReason) -> &'static str {
    match reason {
        ExclusionReason::Inactive => "inactive",
        ExclusionReason::OutsideValidity { .. } => "outside validity window",
        ExclusionReason::SpecialtyMismatch { .. } => "specialty mismatch",
        ExclusionReason::WeekdayMismatch { .. } => "weekday mismatch",
        ExclusionReason::CriterionFailed { .. } => "criteria not met",
    }
}
