use std::fs;
use std::path::Path;

use tracing::warn;

use super::rules::{Rule, RuleValidationError};

/// Source of the current active-rule collection.
///
/// The engine re-applies its own date and criteria filtering, so implementations
/// need not pre-filter beyond the active flag.
pub trait RuleRepository: Send + Sync {
    fn active_rules(&self) -> Result<Vec<Rule>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("rule collection not found: {0}")]
    NotFound(String),
    #[error("rule repository unavailable: {0}")]
    Unavailable(String),
    #[error("rule file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] RuleValidationError),
}

/// Validated, in-memory rule collection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleRepository {
    rules: Vec<Rule>,
}

impl InMemoryRuleRepository {
    pub fn new(rules: Vec<Rule>) -> Result<Self, RepositoryError> {
        validate_all(&rules)?;
        Ok(Self { rules })
    }

    pub fn from_json(raw: &str) -> Result<Self, RepositoryError> {
        Self::new(parse_rules(raw)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, RepositoryError> {
        let raw = fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => RepositoryError::NotFound(path.display().to_string()),
            _ => RepositoryError::Unavailable(format!("{}: {err}", path.display())),
        })?;
        Self::from_json(&raw)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RuleRepository for InMemoryRuleRepository {
    fn active_rules(&self) -> Result<Vec<Rule>, RepositoryError> {
        Ok(self.rules.iter().filter(|rule| rule.active).cloned().collect())
    }
}

/// Parses a JSON array of rules without validating them.
pub fn parse_rules(raw: &str) -> Result<Vec<Rule>, RepositoryError> {
    Ok(serde_json::from_str(raw)?)
}

/// Rejects the whole collection on the first structurally invalid rule.
pub fn validate_all(rules: &[Rule]) -> Result<(), RuleValidationError> {
    for rule in rules {
        if let Err(err) = rule.validate() {
            warn!(rule_id = %rule.id, error = %err, "rejecting malformed rule");
            return Err(err);
        }
    }
    Ok(())
}
