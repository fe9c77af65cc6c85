//! Global rule subsystem.
//!
//! # Data Flow
//! ```text
//! RuleConfiguration (plain value, serde)
//!     → GlobalRule::build (resolves algorithms via AlgorithmRegistry)
//!     → GlobalRuleMetaData::publish (atomic swap of Arc<GlobalRule> for its kind)
//!     → routing/execution engine reads via GlobalRuleMetaData::find
//! ```
//!
//! # Design Decisions
//! - Configurations are values: mutation builds a new one, never edits in place
//! - At most one rule per kind; the slot table is fixed at construction
//! - Readers never block writers and always see a whole rule

pub mod descriptor;
pub mod metadata;
pub mod sql_parser;
pub mod traffic;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::algorithm::AlgorithmRegistry;
use crate::error::RuleResult;

pub use descriptor::{AlgorithmDescriptor, CacheOption};
pub use metadata::GlobalRuleMetaData;
pub use sql_parser::{SqlParserRule, SqlParserRuleConfiguration};
pub use traffic::{TrafficRule, TrafficRuleConfiguration, TrafficStrategyConfiguration};

/// Logical category of global configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    SqlParser,
    Traffic,
}

impl RuleKind {
    pub const ALL: [RuleKind; 2] = [RuleKind::SqlParser, RuleKind::Traffic];

    pub(crate) const fn index(self) -> usize {
        match self {
            RuleKind::SqlParser => 0,
            RuleKind::Traffic => 1,
        }
    }

    /// Label used in metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::SqlParser => "sql_parser",
            RuleKind::Traffic => "traffic",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::SqlParser => f.write_str("SQLParser"),
            RuleKind::Traffic => f.write_str("Traffic"),
        }
    }
}

/// Configuration of one rule kind, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleConfiguration {
    SqlParser(SqlParserRuleConfiguration),
    Traffic(TrafficRuleConfiguration),
}

impl RuleConfiguration {
    pub fn kind(&self) -> RuleKind {
        match self {
            RuleConfiguration::SqlParser(_) => RuleKind::SqlParser,
            RuleConfiguration::Traffic(_) => RuleKind::Traffic,
        }
    }
}

impl From<SqlParserRuleConfiguration> for RuleConfiguration {
    fn from(config: SqlParserRuleConfiguration) -> Self {
        RuleConfiguration::SqlParser(config)
    }
}

impl From<TrafficRuleConfiguration> for RuleConfiguration {
    fn from(config: TrafficRuleConfiguration) -> Self {
        RuleConfiguration::Traffic(config)
    }
}

/// An active rule instance.
#[derive(Debug)]
pub enum GlobalRule {
    SqlParser(SqlParserRule),
    Traffic(TrafficRule),
}

impl GlobalRule {
    /// Build the rule instance for a configuration.
    pub fn build(
        configuration: RuleConfiguration,
        registry: &AlgorithmRegistry,
    ) -> RuleResult<Self> {
        match configuration {
            RuleConfiguration::SqlParser(config) => {
                Ok(GlobalRule::SqlParser(SqlParserRule::new(config)))
            }
            RuleConfiguration::Traffic(config) => {
                Ok(GlobalRule::Traffic(TrafficRule::new(config, registry)?))
            }
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            GlobalRule::SqlParser(_) => RuleKind::SqlParser,
            GlobalRule::Traffic(_) => RuleKind::Traffic,
        }
    }

    /// Owned copy of the configuration the rule was built from.
    pub fn configuration(&self) -> RuleConfiguration {
        match self {
            GlobalRule::SqlParser(rule) => RuleConfiguration::SqlParser(*rule.configuration()),
            GlobalRule::Traffic(rule) => RuleConfiguration::Traffic(rule.configuration().clone()),
        }
    }

    pub fn as_sql_parser(&self) -> Option<&SqlParserRule> {
        match self {
            GlobalRule::SqlParser(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_traffic(&self) -> Option<&TrafficRule> {
        match self {
            GlobalRule::Traffic(rule) => Some(rule),
            _ => None,
        }
    }
}
