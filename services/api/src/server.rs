use crate::cli::ServeArgs;
use crate::infra::{load_reference, load_repository, AppState};
use crate::routes::with_payment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use medfee::config::AppConfig;
use medfee::engine::PaymentService;
use medfee::error::AppError;
use medfee::telemetry;
use medfee::PaymentEngine;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(load_repository(config.rules_path.as_deref())?);
    if repository.is_empty() {
        warn!("no rule file configured; evaluations must supply inline rules");
    }
    let reference = Arc::new(load_reference(config.reference_path.as_deref())?);
    let service = Arc::new(PaymentService::new(
        PaymentEngine::new(config.engine.clone()),
        repository.clone(),
        reference,
    ));

    let app = with_payment_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, rules = repository.len(), "payment rule service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
