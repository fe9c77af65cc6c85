//! Global rule governance for data-access proxy nodes.
//!
//! Resolves pluggable algorithms by type name, merges partial rule updates,
//! keeps traffic descriptors referentially intact, publishes new rules
//! atomically and persists them to a cluster-visible store.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod observability;
pub mod persist;
pub mod rule;
pub mod statement;

pub use algorithm::AlgorithmRegistry;
pub use config::NodeConfig;
pub use error::{ErrorKind, PersistError, RuleError, RuleResult};
pub use handler::{MutationReport, RuleMutation, RuleMutationHandler};
pub use lifecycle::RuleNode;
pub use rule::{GlobalRule, GlobalRuleMetaData, RuleConfiguration, RuleKind};
pub use statement::RuleStatement;
