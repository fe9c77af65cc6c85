//! Error taxonomy for rule mutation.
//!
//! Every failure that can happen before the in-memory publish is a
//! [`RuleError`] and leaves the rule metadata untouched. Persistence failures
//! happen after publish and are reported as warnings on the mutation report.

use thiserror::Error;

use crate::algorithm::AlgorithmKind;
use crate::rule::RuleKind;

/// Structured discriminant of a [`RuleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PreconditionFailure,
    RequiredEntityMissing,
    DuplicateEntity,
    UnknownAlgorithmType,
    InvalidAlgorithm,
    InvalidConfiguration,
    PersistenceFailure,
}

/// Errors raised while resolving algorithms or mutating rule configuration.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The rule kind has never been loaded on this node.
    #[error("{0} rule is not configured")]
    PreconditionFailure(RuleKind),

    /// Named entries targeted by a statement do not exist.
    #[error("Required {kind} rules do not exist: {}", .names.join(", "))]
    RequiredEntityMissing { kind: RuleKind, names: Vec<String> },

    /// Named entries created by a statement already exist.
    #[error("Duplicate {kind} rules: {}", .names.join(", "))]
    DuplicateEntity { kind: RuleKind, names: Vec<String> },

    /// No provider registered for the descriptor type.
    #[error("Unknown {kind} algorithm type `{type_name}`")]
    UnknownAlgorithmType { kind: AlgorithmKind, type_name: String },

    /// A provider rejected the descriptor properties.
    #[error("Invalid {kind} algorithm `{type_name}`: {reason}")]
    InvalidAlgorithm {
        kind: AlgorithmKind,
        type_name: String,
        reason: String,
    },

    /// Configuration breaks a structural invariant.
    #[error("Invalid {kind} rule configuration: {reason}")]
    InvalidConfiguration { kind: RuleKind, reason: String },

    /// Durable store upsert failed.
    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistError),
}

impl RuleError {
    /// The structured discriminant callers branch on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuleError::PreconditionFailure(_) => ErrorKind::PreconditionFailure,
            RuleError::RequiredEntityMissing { .. } => ErrorKind::RequiredEntityMissing,
            RuleError::DuplicateEntity { .. } => ErrorKind::DuplicateEntity,
            RuleError::UnknownAlgorithmType { .. } => ErrorKind::UnknownAlgorithmType,
            RuleError::InvalidAlgorithm { .. } => ErrorKind::InvalidAlgorithm,
            RuleError::InvalidConfiguration { .. } => ErrorKind::InvalidConfiguration,
            RuleError::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }
}

/// Errors reported by a metadata persistence gateway.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The durable store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for rule operations.
pub type RuleResult<T> = Result<T, RuleError>;
