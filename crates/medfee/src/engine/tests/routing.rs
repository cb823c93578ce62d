use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::engine::reference::{ReferenceDirectory, ReferenceKind};
use crate::engine::repository::{InMemoryRuleRepository, RepositoryError, RuleRepository};
use crate::engine::router::payment_router;
use crate::engine::rules::{DimensionTargeting, Rule};
use crate::engine::service::PaymentService;

struct UnavailableRepository;

impl RuleRepository for UnavailableRepository {
    fn active_rules(&self) -> Result<Vec<Rule>, RepositoryError> {
        Err(RepositoryError::Unavailable("rule store offline".to_string()))
    }
}

fn stored_rules() -> InMemoryRuleRepository {
    InMemoryRuleRepository::new(vec![
        dimension_rule("general", cardiology(), percentage(30.0)),
        dimension_rule(
            "doctor",
            DimensionTargeting {
                doctor_id: Some("D-7".to_string()),
                ..cardiology()
            },
            percentage(40.0),
        ),
    ])
    .expect("rules are valid")
}

fn router_with<R: RuleRepository + 'static>(repository: R) -> axum::Router {
    let reference = ReferenceDirectory::default().with(ReferenceKind::Doctor, "D-7", "Dr. Ana Ruiz");
    payment_router(Arc::new(PaymentService::new(
        engine(),
        Arc::new(repository),
        Arc::new(reference),
    )))
}

fn evaluate_request(body: serde_json::Value) -> Request<Body> {
    Request::post("/api/v1/evaluate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn wednesday_payload() -> serde_json::Value {
    json!({
        "event_date": "2025-03-05",
        "base_amount": 100000.0,
        "attributes": { "specialty": "Cardiology", "doctor_id": "D-7" }
    })
}

#[tokio::test]
async fn evaluate_route_uses_repository_rules() {
    let response = router_with(stored_rules())
        .oneshot(evaluate_request(json!({ "context": wednesday_payload() })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["selected_rule"]["id"], "doctor");
    assert_eq!(payload["amount"], 40000.0);
    assert!(payload["explanation"]
        .as_str()
        .expect("explanation text")
        .contains("Dr. Ana Ruiz"));
}

#[tokio::test]
async fn evaluate_route_prefers_inline_rules() {
    let inline = vec![dimension_rule("inline", cardiology(), fixed(1234.0))];
    let response = router_with(UnavailableRepository)
        .oneshot(evaluate_request(json!({
            "context": wednesday_payload(),
            "rules": inline,
        })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["selected_rule"]["id"], "inline");
    assert_eq!(payload["amount"], 1234.0);
}

#[tokio::test]
async fn evaluate_route_rejects_missing_event_date() {
    let response = router_with(stored_rules())
        .oneshot(evaluate_request(json!({
            "context": { "base_amount": 10.0 }
        })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "billing context has no event date");
}

#[tokio::test]
async fn evaluate_route_rejects_invalid_inline_rules() {
    let mut broken = dimension_rule("broken", cardiology(), fixed(1.0));
    broken.valid_to = Some(date(2023, 1, 1));
    let response = router_with(stored_rules())
        .oneshot(evaluate_request(json!({
            "context": wednesday_payload(),
            "rules": [broken],
        })))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn conflicts_route_reports_shared_doctors() {
    let twin = DimensionTargeting {
        doctor_id: Some("D-7".to_string()),
        ..cardiology()
    };
    let repository = InMemoryRuleRepository::new(vec![
        dimension_rule("a", twin.clone(), fixed(1.0)),
        dimension_rule("b", twin, fixed(2.0)),
    ])
    .expect("rules are valid");

    let response = router_with(repository)
        .oneshot(
            Request::get("/api/v1/conflicts")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["conflicts"][0]["first"], "a");
    assert_eq!(payload["conflicts"][0]["shared_dimensions"], json!(["doctor"]));
}

#[tokio::test]
async fn conflicts_route_surfaces_repository_outage() {
    let response = router_with(UnavailableRepository)
        .oneshot(
            Request::get("/api/v1/conflicts")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
