//! Configuration validation.
//!
//! # Responsibilities
//! - Check referential integrity (strategies reference existing descriptors)
//! - Reject duplicate strategy names
//! - Reject descriptors without a type
//! - Check mode and persistence agree
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: NodeConfig → Result<(), Vec<ValidationError>>
//! - Algorithm types are resolved later, against the registry, at rule build

use std::fmt;

use crate::config::schema::{NodeConfig, NodeMode};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &NodeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.node.mode == NodeMode::Cluster && !config.persistence.enabled {
        errors.push(ValidationError::new(
            "node.mode",
            "cluster mode requires persistence.enabled = true",
        ));
    }
    if config.persistence.enabled && config.persistence.path.as_os_str().is_empty() {
        errors.push(ValidationError::new("persistence.path", "must not be empty"));
    }

    let traffic = &config.rules.traffic;
    for name in traffic.duplicate_strategy_names() {
        errors.push(ValidationError::new(
            "rules.traffic.strategies",
            format!("duplicate strategy name `{}`", name),
        ));
    }
    for reference in traffic.dangling_references() {
        errors.push(ValidationError::new("rules.traffic.strategies", reference));
    }
    for (name, descriptor) in traffic.algorithms.iter() {
        if descriptor.type_name().trim().is_empty() {
            errors.push(ValidationError::new(
                format!("rules.traffic.algorithms.{}", name),
                "type must not be empty",
            ));
        }
    }
    for (name, descriptor) in traffic.load_balancers.iter() {
        if descriptor.type_name().trim().is_empty() {
            errors.push(ValidationError::new(
                format!("rules.traffic.load_balancers.{}", name),
                "type must not be empty",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
