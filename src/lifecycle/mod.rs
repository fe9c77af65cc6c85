//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     NodeConfig → AlgorithmRegistry (built-ins) → durable store
//!     → load stored rules, seed missing kinds from [rules]
//!     → build every GlobalRule (fail fast) → GlobalRuleMetaData
//!     → RuleMutationHandler
//!
//! Cluster refresh (optional):
//!     RuleWatcher → RuleMutationHandler::refresh
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Stored rules win over configured seeds
//! - The registry is complete before any rule is built

pub mod startup;

pub use startup::{RuleNode, StartupError};
