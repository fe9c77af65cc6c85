//! Pluggable algorithm subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap:
//!     AlgorithmRegistry::with_builtin()
//!     → shadow.rs / traffic.rs / load_balance.rs register providers
//!     → registry frozen behind Arc (read-only from here on)
//!
//! Rule construction:
//!     AlgorithmDescriptor { type, properties }
//!     → registry.create::<C>(descriptor)
//!     → Provider lookup by exact type name
//!     → Arc<C::Instance> or UnknownAlgorithmType / InvalidAlgorithm
//! ```
//!
//! # Design Decisions
//! - One provider table per capability, keyed by the type name each provider declares
//! - Providers are plain constructor functions; no runtime discovery
//! - Instances are immutable once built and shared via Arc

pub mod load_balance;
pub mod registry;
pub mod shadow;
pub mod traffic;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use load_balance::LoadBalanceAlgorithm;
pub use registry::{
    AlgorithmRegistry, Capability, LoadBalanceCapability, Provider, ShadowCapability,
    TrafficCapability,
};
pub use shadow::ShadowAlgorithm;
pub use traffic::TrafficAlgorithm;

/// Algorithm properties, ordered for stable equality and serialization.
pub type Properties = BTreeMap<String, String>;

/// Capability kinds a provider can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    Shadow,
    Traffic,
    LoadBalancer,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 3] = [
        AlgorithmKind::Shadow,
        AlgorithmKind::Traffic,
        AlgorithmKind::LoadBalancer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmKind::Shadow => "shadow",
            AlgorithmKind::Traffic => "traffic",
            AlgorithmKind::LoadBalancer => "load_balancer",
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlgorithmKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown algorithm kind `{}`", s))
    }
}

/// Behaviour shared by every algorithm instance.
pub trait Algorithm: Send + Sync + fmt::Debug {
    /// Stable type identifier the provider was registered under.
    fn type_name(&self) -> &'static str;

    /// Properties the instance was built from.
    fn properties(&self) -> &Properties;
}

/// Look up a property the algorithm cannot be built without.
pub(crate) fn require_property<'a>(props: &'a Properties, key: &str) -> Result<&'a str, String> {
    match props.get(key).map(|v| v.trim()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(format!("property `{}` is required", key)),
    }
}
