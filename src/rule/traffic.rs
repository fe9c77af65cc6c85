//! Traffic rule: strategies that divert matched statements to labelled
//! compute nodes, plus the algorithm and load balancer descriptors they
//! reference by name.
//!
//! # Invariants
//! - Strategy names are unique
//! - Every referenced algorithm / load balancer name has a descriptor
//!
//! Both are checked when a [`TrafficRule`] is built, so a published rule
//! always satisfies them.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::algorithm::{
    AlgorithmRegistry, LoadBalanceAlgorithm, LoadBalanceCapability, TrafficAlgorithm,
    TrafficCapability,
};
use crate::error::{RuleError, RuleResult};
use crate::rule::{AlgorithmDescriptor, RuleKind};

/// One traffic strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficStrategyConfiguration {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    pub algorithm_name: String,
    pub load_balancer_name: String,
}

/// Full traffic rule configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficRuleConfiguration {
    pub strategies: Vec<TrafficStrategyConfiguration>,
    pub algorithms: BTreeMap<String, AlgorithmDescriptor>,
    pub load_balancers: BTreeMap<String, AlgorithmDescriptor>,
}

impl TrafficRuleConfiguration {
    /// Names of all strategies, in order.
    pub fn strategy_names(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|each| each.name.as_str())
    }

    pub fn find_strategy(&self, name: &str) -> Option<&TrafficStrategyConfiguration> {
        self.strategies.iter().find(|each| each.name == name)
    }

    /// Algorithm descriptors no surviving strategy references.
    pub fn unused_algorithms(&self) -> Vec<String> {
        let in_use: HashSet<&str> = self
            .strategies
            .iter()
            .map(|each| each.algorithm_name.as_str())
            .collect();
        self.algorithms
            .keys()
            .filter(|name| !in_use.contains(name.as_str()))
            .cloned()
            .collect()
    }

    /// Load balancer descriptors no surviving strategy references.
    pub fn unused_load_balancers(&self) -> Vec<String> {
        let in_use: HashSet<&str> = self
            .strategies
            .iter()
            .map(|each| each.load_balancer_name.as_str())
            .collect();
        self.load_balancers
            .keys()
            .filter(|name| !in_use.contains(name.as_str()))
            .cloned()
            .collect()
    }

    /// Cascade cleanup: drop every descriptor the surviving strategies do not
    /// reference. Returns the number of descriptors removed; a second call
    /// without further changes removes nothing.
    pub fn remove_unused_descriptors(&mut self) -> usize {
        let algorithms = self.unused_algorithms();
        let load_balancers = self.unused_load_balancers();
        for name in &algorithms {
            self.algorithms.remove(name);
        }
        for name in &load_balancers {
            self.load_balancers.remove(name);
        }
        if !algorithms.is_empty() || !load_balancers.is_empty() {
            tracing::debug!(
                algorithms = ?algorithms,
                load_balancers = ?load_balancers,
                "Removed unused traffic descriptors"
            );
        }
        algorithms.len() + load_balancers.len()
    }

    /// Strategy names occurring more than once.
    pub fn duplicate_strategy_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = BTreeSet::new();
        for name in self.strategy_names() {
            if !seen.insert(name) {
                duplicates.insert(name.to_string());
            }
        }
        duplicates.into_iter().collect()
    }

    /// Describe every reference to a missing descriptor.
    pub fn dangling_references(&self) -> Vec<String> {
        let mut dangling = Vec::new();
        for strategy in &self.strategies {
            if !self.algorithms.contains_key(&strategy.algorithm_name) {
                dangling.push(format!(
                    "strategy `{}` references missing algorithm `{}`",
                    strategy.name, strategy.algorithm_name
                ));
            }
            if !self.load_balancers.contains_key(&strategy.load_balancer_name) {
                dangling.push(format!(
                    "strategy `{}` references missing load balancer `{}`",
                    strategy.name, strategy.load_balancer_name
                ));
            }
        }
        dangling
    }
}

/// A strategy with its algorithm instances resolved.
#[derive(Debug, Clone)]
pub struct TrafficStrategy {
    pub name: String,
    pub labels: BTreeSet<String>,
    pub algorithm: Arc<dyn TrafficAlgorithm>,
    pub load_balancer: Arc<dyn LoadBalanceAlgorithm>,
}

/// Active traffic rule.
#[derive(Debug)]
pub struct TrafficRule {
    configuration: TrafficRuleConfiguration,
    strategies: Vec<TrafficStrategy>,
}

impl TrafficRule {
    /// Build the rule, instantiating every descriptor through the registry.
    /// Fails without side effects if any descriptor cannot be resolved or the
    /// configuration breaks an invariant.
    pub fn new(
        configuration: TrafficRuleConfiguration,
        registry: &AlgorithmRegistry,
    ) -> RuleResult<Self> {
        let duplicates = configuration.duplicate_strategy_names();
        if !duplicates.is_empty() {
            return Err(RuleError::InvalidConfiguration {
                kind: RuleKind::Traffic,
                reason: format!("duplicate strategy names: {}", duplicates.join(", ")),
            });
        }
        let dangling = configuration.dangling_references();
        if !dangling.is_empty() {
            return Err(RuleError::InvalidConfiguration {
                kind: RuleKind::Traffic,
                reason: dangling.join("; "),
            });
        }

        let mut algorithms = HashMap::with_capacity(configuration.algorithms.len());
        for (name, descriptor) in &configuration.algorithms {
            algorithms.insert(name.as_str(), registry.create::<TrafficCapability>(descriptor)?);
        }
        let mut load_balancers = HashMap::with_capacity(configuration.load_balancers.len());
        for (name, descriptor) in &configuration.load_balancers {
            load_balancers.insert(
                name.as_str(),
                registry.create::<LoadBalanceCapability>(descriptor)?,
            );
        }

        let mut strategies = Vec::with_capacity(configuration.strategies.len());
        for each in &configuration.strategies {
            // references were checked above
            let (Some(algorithm), Some(load_balancer)) = (
                algorithms.get(each.algorithm_name.as_str()),
                load_balancers.get(each.load_balancer_name.as_str()),
            ) else {
                continue;
            };
            strategies.push(TrafficStrategy {
                name: each.name.clone(),
                labels: each.labels.clone(),
                algorithm: algorithm.clone(),
                load_balancer: load_balancer.clone(),
            });
        }

        Ok(Self {
            configuration,
            strategies,
        })
    }

    pub fn configuration(&self) -> &TrafficRuleConfiguration {
        &self.configuration
    }

    pub fn strategies(&self) -> &[TrafficStrategy] {
        &self.strategies
    }

    pub fn find_strategy(&self, name: &str) -> Option<&TrafficStrategy> {
        self.strategies.iter().find(|each| each.name == name)
    }

    /// Strategies that may route to an instance carrying `label`.
    pub fn strategies_for_label<'a>(
        &'a self,
        label: &'a str,
    ) -> impl Iterator<Item = &'a TrafficStrategy> + 'a {
        self.strategies
            .iter()
            .filter(move |each| each.labels.contains(label))
    }
}
