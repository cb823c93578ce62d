use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use medfee::engine::{payment_router, PaymentService, RuleRepository};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_payment_routes<R>(service: Arc<PaymentService<R>>) -> axum::Router
where
    R: RuleRepository + 'static,
{
    payment_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::sample_rules;
    use axum::body::Body;
    use axum::http::Request;
    use medfee::engine::{InMemoryRuleRepository, ReferenceDirectory};
    use medfee::PaymentEngine;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let repository = InMemoryRuleRepository::new(sample_rules()).expect("sample rules are valid");
        let service = Arc::new(PaymentService::new(
            PaymentEngine::default(),
            Arc::new(repository),
            Arc::new(ReferenceDirectory::default()),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_payment_routes(service).layer(Extension(state))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json payload")
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_tracks_startup_flag() {
        let response = app(false)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request builds"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["status"], "initializing");

        let response = app(true)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request builds"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn evaluate_route_is_mounted_alongside_probes() {
        let request = Request::post("/api/v1/evaluate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "context": {
                        "event_date": "2025-03-08",
                        "base_amount": 200000.0,
                        "attributes": { "specialty": "cardiology", "doctor_id": "D-2" }
                    }
                })
                .to_string(),
            ))
            .expect("request builds");

        let response = app(true).oneshot(request).await.expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["selected_rule"]["id"], "CARD-WKND");
        assert_eq!(payload["amount"], 90000.0);
    }
}
