use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::audit::ConflictReport;
use super::context::BillingContext;
use super::repository::{RepositoryError, RuleRepository};
use super::rules::Rule;
use super::service::{PaymentService, PaymentServiceError};

/// Body of `POST /api/v1/evaluate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub context: BillingContext,
    /// Overrides the configured repository for this call only.
    #[serde(default)]
    pub rules: Option<Vec<Rule>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictsResponse {
    pub conflicts: Vec<ConflictReport>,
}

/// Router builder exposing evaluation and audit endpoints.
pub fn payment_router<R>(service: Arc<PaymentService<R>>) -> Router
where
    R: RuleRepository + 'static,
{
    Router::new()
        .route("/api/v1/evaluate", post(evaluate_handler::<R>))
        .route("/api/v1/conflicts", get(conflicts_handler::<R>))
        .with_state(service)
}

pub(crate) async fn evaluate_handler<R>(
    State(service): State<Arc<PaymentService<R>>>,
    axum::Json(request): axum::Json<EvaluateRequest>,
) -> Response
where
    R: RuleRepository + 'static,
{
    match service.evaluate(&request.context, request.rules) {
        Ok(decision) => (StatusCode::OK, axum::Json(decision)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn conflicts_handler<R>(State(service): State<Arc<PaymentService<R>>>) -> Response
where
    R: RuleRepository + 'static,
{
    match service.conflicts() {
        Ok(conflicts) => (StatusCode::OK, axum::Json(ConflictsResponse { conflicts })).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: PaymentServiceError) -> Response {
    let status = match &err {
        PaymentServiceError::Evaluation(_) => StatusCode::BAD_REQUEST,
        PaymentServiceError::Repository(RepositoryError::Invalid(_))
        | PaymentServiceError::Repository(RepositoryError::Malformed(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PaymentServiceError::Repository(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
        PaymentServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
