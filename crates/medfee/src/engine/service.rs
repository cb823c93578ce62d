use std::sync::Arc;

use tracing::info;

use super::audit::{audit_conflicts, ConflictReport};
use super::context::BillingContext;
use super::reference::ReferenceDirectory;
use super::repository::{validate_all, RepositoryError, RuleRepository};
use super::rules::Rule;
use super::{DecisionResult, EvaluationError, PaymentEngine};

/// Service pairing the engine with a rule source and reference names.
pub struct PaymentService<R> {
    engine: PaymentEngine,
    repository: Arc<R>,
    reference: Arc<ReferenceDirectory>,
}

impl<R> PaymentService<R>
where
    R: RuleRepository + 'static,
{
    pub fn new(engine: PaymentEngine, repository: Arc<R>, reference: Arc<ReferenceDirectory>) -> Self {
        Self {
            engine,
            repository,
            reference,
        }
    }

    pub fn engine(&self) -> &PaymentEngine {
        &self.engine
    }

    /// Evaluates against `inline` rules when given, otherwise the repository snapshot.
    ///
    /// Inline rules pass the same structural validation as persisted ones.
    pub fn evaluate(
        &self,
        context: &BillingContext,
        inline: Option<Vec<Rule>>,
    ) -> Result<DecisionResult, PaymentServiceError> {
        let rules = match inline {
            Some(rules) => {
                validate_all(&rules).map_err(RepositoryError::from)?;
                rules
            }
            None => self.repository.active_rules()?,
        };

        let decision = self
            .engine
            .evaluate_with(context, &rules, self.reference.as_ref())?;
        info!(
            rules = rules.len(),
            selected = decision
                .selected_rule
                .as_ref()
                .map(|rule| rule.id.0.as_str())
                .unwrap_or("none"),
            amount = decision.amount,
            "payment evaluated"
        );
        Ok(decision)
    }

    pub fn conflicts(&self) -> Result<Vec<ConflictReport>, PaymentServiceError> {
        let rules = self.repository.active_rules()?;
        Ok(audit_conflicts(&rules))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentServiceError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
