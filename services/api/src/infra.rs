use chrono::NaiveDate;
use medfee::engine::{BillingContext, InMemoryRuleRepository, ReferenceDirectory};
use medfee::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::fs::{self, File};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// An absent path yields an empty repository; callers then rely on inline rules.
pub(crate) fn load_repository(path: Option<&Path>) -> Result<InMemoryRuleRepository, AppError> {
    match path {
        Some(path) => Ok(InMemoryRuleRepository::from_path(path)?),
        None => Ok(InMemoryRuleRepository::default()),
    }
}

pub(crate) fn load_reference(path: Option<&Path>) -> Result<ReferenceDirectory, AppError> {
    match path {
        Some(path) => Ok(ReferenceDirectory::from_csv_reader(File::open(path)?)?),
        None => Ok(ReferenceDirectory::default()),
    }
}

pub(crate) fn read_context(path: &Path) -> Result<BillingContext, AppError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
