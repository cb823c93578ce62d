use crate::infra::{load_reference, load_repository, read_context};
use clap::Args;
use medfee::engine::{audit_repository, DecisionResult, RuleRepository};
use medfee::error::AppError;
use medfee::PaymentEngine;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// JSON array of rules
    #[arg(long)]
    pub(crate) rules: PathBuf,
    /// JSON billing context
    #[arg(long)]
    pub(crate) context: PathBuf,
    /// CSV of display names (kind,id,name) used in the explanation
    #[arg(long)]
    pub(crate) reference_csv: Option<PathBuf>,
    /// Print the full decision as JSON instead of the text summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct AuditArgs {
    /// JSON array of rules
    #[arg(long)]
    pub(crate) rules: PathBuf,
    /// Print conflict reports as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let repository = load_repository(Some(args.rules.as_path()))?;
    let reference = load_reference(args.reference_csv.as_deref())?;
    let context = read_context(&args.context)?;

    let rules = repository.active_rules()?;
    let decision = PaymentEngine::default().evaluate_with(&context, &rules, &reference)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        render_decision(&decision);
    }
    Ok(())
}

pub(crate) fn run_audit(args: AuditArgs) -> Result<(), AppError> {
    let repository = load_repository(Some(args.rules.as_path()))?;
    let reports = audit_repository(&repository)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("No conflicting rules among {} active rule(s).", repository.len());
    }
    for report in reports {
        let shared: Vec<&str> = report
            .shared_dimensions
            .iter()
            .map(|dimension| dimension.label())
            .collect();
        println!(
            "{} <-> {} [{}]: {}",
            report.first,
            report.second,
            shared.join(", "),
            report.reason
        );
    }
    Ok(())
}

pub(crate) fn render_decision(decision: &DecisionResult) {
    match &decision.selected_rule {
        Some(rule) => println!("Selected: {} {} ({})", rule.id, rule.code, rule.name),
        None => println!("Selected: none"),
    }
    println!("Amount: {:.2}", decision.amount);
    println!("{}", decision.explanation);
    for warning in &decision.warnings {
        println!("warning: {warning}");
    }
}
