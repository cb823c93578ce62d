use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::context::{
    NormalizedContext, DOCTOR_ID, PARTICIPATION_TYPE, SCHEDULE_TYPE, SERVICE_ID, SOCIETY_ID,
};
use super::rules::{Dimension, DimensionTargeting, ParticipationType};
use crate::config::EngineConfig;

pub const DOCTOR_POINTS: f64 = 1000.0;
pub const SERVICE_POINTS: f64 = 500.0;
pub const INDIVIDUAL_POINTS: f64 = 200.0;
pub const SOCIETY_PARTICIPATION_POINTS: f64 = 150.0;
pub const SCHEDULE_POINTS: f64 = 100.0;
pub const NIGHT_SCHEDULE_BONUS: f64 = 50.0;
pub const DAYS_BASE_POINTS: f64 = 25.0;
pub const DAYS_NARROWING_POINTS: f64 = 5.0;
pub const WEEKEND_DAY_POINTS: f64 = 30.0;
pub const SOCIETY_POINTS: f64 = 75.0;

/// Discrete contribution to a specificity score, kept for explanations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub dimension: Dimension,
    pub points: f64,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecificityBreakdown {
    pub total: f64,
    pub components: Vec<ScoreComponent>,
    /// Dimensions set on the rule that disagree with the event; they earn no points.
    pub soft_mismatches: Vec<Dimension>,
}

impl SpecificityBreakdown {
    fn award(&mut self, dimension: Dimension, points: f64, notes: String) {
        self.total += points;
        self.components.push(ScoreComponent {
            dimension,
            points,
            notes,
        });
    }

    fn mismatch(&mut self, dimension: Dimension, notes: String) {
        self.soft_mismatches.push(dimension);
        self.components.push(ScoreComponent {
            dimension,
            points: 0.0,
            notes,
        });
    }
}

/// Weighs how narrowly a discrete-dimension rule targets an event.
///
/// Points follow the dimensions set on the rule. A soft dimension earns its
/// points when the event agrees with it or says nothing about it; a
/// disagreeing soft dimension earns nothing and is recorded as a mismatch.
pub struct SpecificityScorer<'c> {
    config: &'c EngineConfig,
}

impl<'c> SpecificityScorer<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self { config }
    }

    pub fn score(
        &self,
        targeting: &DimensionTargeting,
        created_on: Option<NaiveDate>,
        context: &NormalizedContext,
    ) -> SpecificityBreakdown {
        let mut breakdown = SpecificityBreakdown::default();

        soft_identifier(
            &mut breakdown,
            Dimension::Doctor,
            targeting.doctor_id.as_deref(),
            context.text(DOCTOR_ID),
            DOCTOR_POINTS,
        );
        soft_identifier(
            &mut breakdown,
            Dimension::Service,
            targeting.service_id.as_deref(),
            context.text(SERVICE_ID),
            SERVICE_POINTS,
        );

        if let Some(participation) = targeting.participation {
            let points = match participation {
                ParticipationType::Individual => INDIVIDUAL_POINTS,
                ParticipationType::Society => SOCIETY_PARTICIPATION_POINTS,
                ParticipationType::Mixed => 0.0,
            };
            let found = context.text(PARTICIPATION_TYPE);
            let agrees = participation == ParticipationType::Mixed
                || found
                    .as_deref()
                    .map(|value| value == participation.label())
                    .unwrap_or(true);
            if !agrees {
                breakdown.mismatch(
                    Dimension::Participation,
                    format!(
                        "participation {} differs from event {}",
                        participation.label(),
                        found.unwrap_or_default()
                    ),
                );
            } else if points > 0.0 {
                breakdown.award(
                    Dimension::Participation,
                    points,
                    format!("participation restricted to {}", participation.label()),
                );
            }
        }

        if let Some(schedule) = targeting.schedule_constraint() {
            let schedule = schedule.to_lowercase();
            let found = context.text(SCHEDULE_TYPE);
            let agrees = found.as_deref().map(|value| value == schedule).unwrap_or(true);
            if agrees {
                let mut points = SCHEDULE_POINTS;
                if schedule == "night" {
                    points += NIGHT_SCHEDULE_BONUS;
                }
                breakdown.award(
                    Dimension::Schedule,
                    points,
                    format!("schedule restricted to {schedule}"),
                );
            } else {
                breakdown.mismatch(
                    Dimension::Schedule,
                    format!(
                        "schedule {schedule} differs from event {}",
                        found.unwrap_or_default()
                    ),
                );
            }
        }

        if targeting.restricts_days() {
            let days = targeting.distinct_days();
            let mut points = DAYS_BASE_POINTS + DAYS_NARROWING_POINTS * (7 - days.len()) as f64;
            let weekend = days
                .iter()
                .any(|day| matches!(day, Weekday::Sat | Weekday::Sun));
            if weekend {
                points += WEEKEND_DAY_POINTS;
            }
            breakdown.award(
                Dimension::Weekdays,
                points,
                format!(
                    "restricted to {} day(s){}",
                    days.len(),
                    if weekend { " including a weekend day" } else { "" }
                ),
            );
        }

        soft_identifier(
            &mut breakdown,
            Dimension::Society,
            targeting.society_id.as_deref(),
            context.text(SOCIETY_ID),
            SOCIETY_POINTS,
        );

        if let (Some(created_on), Some(event_date)) = (created_on, context.event_date) {
            let points = self.recency_points(created_on, event_date);
            if points > 0.0 {
                breakdown.award(
                    Dimension::Recency,
                    points,
                    format!("created {created_on}"),
                );
            }
        }

        breakdown
    }

    /// Decays linearly from the configured maximum, measured against the event date.
    pub fn recency_points(&self, created_on: NaiveDate, event_date: NaiveDate) -> f64 {
        let age_days = (event_date - created_on).num_days().max(0) as f64;
        (self.config.recency_max_points - self.config.recency_decay_per_day * age_days).max(0.0)
    }
}

fn soft_identifier(
    breakdown: &mut SpecificityBreakdown,
    dimension: Dimension,
    required: Option<&str>,
    found: Option<String>,
    points: f64,
) {
    let Some(required) = required else {
        return;
    };
    let required = required.trim().to_lowercase();
    match found {
        Some(found) if found != required => breakdown.mismatch(
            dimension,
            format!("{} {required} differs from event {found}", dimension.label()),
        ),
        _ => breakdown.award(
            dimension,
            points,
            format!("{} restricted to {required}", dimension.label()),
        ),
    }
}
