use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::EntityKind;
use crate::persistence::StoreError;
use crate::sampling::DistributionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
    #[error("intake record {intake_record} is already linked to case {case_reference}")]
    IntakeAlreadyLinked { intake_record: String, case_reference: String },
    #[error("consolidation budget of {budget} secondary links exhausted")]
    ConsolidationBudgetExhausted { budget: usize },
    #[error("phase {phase} depends on {dependency}, which is not scheduled before it")]
    PhaseOrder { phase: &'static str, dependency: &'static str },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("missing prerequisite for phase {phase}: {message}")]
    MissingPrerequisite { phase: &'static str, message: String },
    #[error(transparent)]
    DistributionConfig(#[from] DistributionError),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("flushing {kind} batch failed after {attempts} attempts: {source}")]
    PersistenceBatch {
        kind: EntityKind,
        attempts: u32,
        #[source]
        source: StoreError,
    },
    #[error("reading committed records failed: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("narrative template failure: {0}")]
    Template(String),
}

impl GenerationError {
    pub fn missing(phase: &'static str, message: impl Into<String>) -> Self {
        Self::MissingPrerequisite { phase, message: message.into() }
    }

    /// Stable machine-readable class used by the operator CLI.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::MissingPrerequisite { .. } => "missing_prerequisite",
            Self::DistributionConfig(_) => "distribution_config",
            Self::Configuration(_) => "config_validation",
            Self::PersistenceBatch { .. } => "persistence_batch",
            Self::Store(_) => "store_read",
            Self::Domain(_) => "invariant_violation",
            Self::Template(_) => "template",
        }
    }
}

impl From<ConfigError> for GenerationError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::Distribution(source) => Self::DistributionConfig(source),
            other => Self::Configuration(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DomainError, GenerationError};
    use crate::domain::EntityKind;
    use crate::persistence::StoreError;
    use crate::sampling::DistributionError;

    #[test]
    fn missing_prerequisite_names_phase() {
        let error = GenerationError::missing("cases", "no intake records committed");
        assert_eq!(error.error_class(), "missing_prerequisite");
        assert_eq!(
            error.to_string(),
            "missing prerequisite for phase cases: no intake records committed"
        );
    }

    #[test]
    fn distribution_errors_convert_transparently() {
        let error = GenerationError::from(DistributionError::ZeroSum { name: "case_status".into() });
        assert_eq!(error.error_class(), "distribution_config");
        assert!(error.to_string().contains("case_status"));
    }

    #[test]
    fn persistence_batch_error_reports_kind_and_attempts() {
        let error = GenerationError::PersistenceBatch {
            kind: EntityKind::Case,
            attempts: 2,
            source: StoreError::Backend("disk full".to_string()),
        };
        assert_eq!(error.error_class(), "persistence_batch");
        assert!(error.to_string().contains("CASE batch failed after 2 attempts"));
    }

    #[test]
    fn domain_errors_map_to_invariant_class() {
        let error = GenerationError::from(DomainError::InvariantViolation("x".to_string()));
        assert_eq!(error.error_class(), "invariant_violation");
    }
}
