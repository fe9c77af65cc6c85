//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::rule::{RuleConfiguration, SqlParserRuleConfiguration, TrafficRuleConfiguration};

/// Root configuration for a rule node.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    /// Node identity and operating mode.
    pub node: NodeSection,

    /// Durable store settings.
    pub persistence: PersistenceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Initial rules used when the durable store holds none.
    pub rules: RulesConfig,
}

/// How the node shares its rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeMode {
    /// Rules live in memory only.
    #[default]
    Standalone,
    /// Rules are persisted to, and refreshed from, a shared store.
    Cluster,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeSection {
    /// Node identifier for logging.
    pub id: String,

    pub mode: NodeMode,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mode: NodeMode::Standalone,
        }
    }
}

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Enable the file-backed store.
    pub enabled: bool,

    /// Path of the shared rules document.
    pub path: PathBuf,

    /// Refresh rules when another node rewrites the document.
    pub watch: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("data/global-rules.json"),
            watch: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Seed rule configurations.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RulesConfig {
    pub sql_parser: SqlParserRuleConfiguration,
    pub traffic: TrafficRuleConfiguration,
}

impl RulesConfig {
    /// Every seeded configuration, ordered by kind.
    pub fn configurations(&self) -> Vec<RuleConfiguration> {
        vec![self.sql_parser.into(), self.traffic.clone().into()]
    }
}
