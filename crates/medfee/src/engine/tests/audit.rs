use super::common::*;
use crate::engine::audit::{audit_conflicts, audit_repository};
use crate::engine::repository::{InMemoryRuleRepository, RepositoryError, RuleRepository};
use crate::engine::rules::{Dimension, DimensionTargeting, ParticipationType, Rule, RuleId};

fn doctor_rule(id: &str, specialty: &str) -> Rule {
    dimension_rule(
        id,
        DimensionTargeting {
            specialty_id: Some(specialty.to_string()),
            doctor_id: Some("D-7".to_string()),
            ..DimensionTargeting::default()
        },
        fixed(10.0),
    )
}

#[test]
fn shared_doctor_in_same_specialty_conflicts() {
    let rules = vec![doctor_rule("a", "cardiology"), doctor_rule("b", "Cardiology")];
    let reports = audit_conflicts(&rules);

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].first, RuleId("a".to_string()));
    assert_eq!(reports[0].second, RuleId("b".to_string()));
    assert_eq!(reports[0].shared_dimensions, vec![Dimension::Doctor]);
    assert!(reports[0].reason.contains("doctor"));
}

#[test]
fn differing_specialties_never_conflict() {
    let rules = vec![doctor_rule("a", "cardiology"), doctor_rule("b", "neurology")];
    assert!(audit_conflicts(&rules).is_empty());
}

#[test]
fn disjoint_validity_windows_never_conflict() {
    let mut old = doctor_rule("old", "cardiology");
    old.valid_to = Some(date(2024, 6, 30));
    let mut new = doctor_rule("new", "cardiology");
    new.valid_from = date(2024, 7, 1);
    assert!(audit_conflicts(&[old.clone(), new.clone()]).is_empty());

    new.valid_from = date(2024, 6, 30);
    assert_eq!(audit_conflicts(&[old, new]).len(), 1);
}

#[test]
fn inactive_and_unconstrained_rules_are_ignored() {
    let mut inactive = doctor_rule("inactive", "cardiology");
    inactive.active = false;
    let broad = dimension_rule(
        "broad",
        DimensionTargeting {
            schedule_type: Some("all".to_string()),
            ..cardiology()
        },
        fixed(1.0),
    );
    let broad_twin = dimension_rule(
        "broad-twin",
        DimensionTargeting {
            schedule_type: Some("ALL".to_string()),
            ..cardiology()
        },
        fixed(1.0),
    );
    let rules = vec![inactive, doctor_rule("active", "cardiology"), broad, broad_twin];
    assert!(audit_conflicts(&rules).is_empty());
}

#[test]
fn reports_every_shared_dimension() {
    let targeting = DimensionTargeting {
        service_id: Some("S-1".to_string()),
        participation: Some(ParticipationType::Society),
        schedule_type: Some("night".to_string()),
        ..cardiology()
    };
    let rules = vec![
        dimension_rule("x", targeting.clone(), fixed(1.0)),
        dimension_rule("y", targeting, fixed(2.0)),
    ];
    let reports = audit_conflicts(&rules);
    assert_eq!(
        reports[0].shared_dimensions,
        vec![
            Dimension::Service,
            Dimension::Participation,
            Dimension::Schedule
        ]
    );
}

struct OfflineRepository;

impl RuleRepository for OfflineRepository {
    fn active_rules(&self) -> Result<Vec<Rule>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[test]
fn audit_surfaces_repository_errors_unchanged() {
    match audit_repository(&OfflineRepository) {
        Err(RepositoryError::Unavailable(message)) => assert_eq!(message, "database offline"),
        other => panic!("expected unavailable error, got {other:?}"),
    }

    let repository = InMemoryRuleRepository::new(vec![
        doctor_rule("a", "cardiology"),
        doctor_rule("b", "cardiology"),
    ])
    .expect("rules are valid");
    assert_eq!(audit_repository(&repository).expect("audit runs").len(), 1);
}
