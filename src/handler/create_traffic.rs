//! `CREATE TRAFFIC RULE`: append new strategies with their descriptors.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{RuleError, RuleResult};
use crate::handler::{traffic_configuration, RuleMutation};
use crate::rule::{
    AlgorithmDescriptor, RuleConfiguration, RuleKind, TrafficRuleConfiguration,
    TrafficStrategyConfiguration,
};
use crate::statement::{CreateTrafficRuleStatement, TrafficRuleSegment};

impl TrafficRuleSegment {
    /// Descriptor name for this strategy's algorithm: `{strategy}_{type}`, lower-cased.
    pub fn algorithm_name(&self) -> String {
        format!("{}_{}", self.name, self.algorithm.type_name()).to_lowercase()
    }

    pub fn load_balancer_name(&self) -> String {
        format!("{}_{}", self.name, self.load_balancer.type_name()).to_lowercase()
    }

    /// Strategy record plus its descriptors, written into `config`.
    pub(crate) fn write_into(
        &self,
        config: &mut TrafficRuleConfiguration,
    ) -> TrafficStrategyConfiguration {
        let algorithm_name = self.algorithm_name();
        let load_balancer_name = self.load_balancer_name();
        config
            .algorithms
            .insert(algorithm_name.clone(), self.algorithm.clone());
        config
            .load_balancers
            .insert(load_balancer_name.clone(), self.load_balancer.clone());
        TrafficStrategyConfiguration {
            name: self.name.clone(),
            labels: self.labels.clone(),
            algorithm_name,
            load_balancer_name,
        }
    }
}

/// Names repeated inside one statement.
pub(crate) fn repeated_names(segments: &[TrafficRuleSegment]) -> BTreeSet<String> {
    let mut seen = HashSet::new();
    segments
        .iter()
        .filter(|each| !seen.insert(each.name.as_str()))
        .map(|each| each.name.clone())
        .collect()
}

/// Derived descriptor names the segments cannot write: another segment
/// derives the same name with different content, or a strategy the
/// statement leaves untouched references a different descriptor under it.
pub(crate) fn conflicting_descriptors(
    current: &TrafficRuleConfiguration,
    segments: &[TrafficRuleSegment],
) -> BTreeSet<String> {
    let rewritten: HashSet<&str> = segments.iter().map(|each| each.name.as_str()).collect();
    let kept = || {
        current
            .strategies
            .iter()
            .filter(|each| !rewritten.contains(each.name.as_str()))
    };
    let in_use_algorithms: HashSet<&str> =
        kept().map(|each| each.algorithm_name.as_str()).collect();
    let in_use_load_balancers: HashSet<&str> =
        kept().map(|each| each.load_balancer_name.as_str()).collect();

    let mut conflicts = BTreeSet::new();
    let mut claimed: HashMap<String, &AlgorithmDescriptor> = HashMap::new();
    for segment in segments {
        let derived = [
            (
                segment.algorithm_name(),
                &segment.algorithm,
                &current.algorithms,
                &in_use_algorithms,
            ),
            (
                segment.load_balancer_name(),
                &segment.load_balancer,
                &current.load_balancers,
                &in_use_load_balancers,
            ),
        ];
        for (name, descriptor, stored, in_use) in derived {
            let clashes_with_kept = in_use.contains(name.as_str())
                && stored.get(&name).is_some_and(|existing| existing != descriptor);
            let clashes_in_statement = claimed
                .get(&name)
                .is_some_and(|other| *other != descriptor);
            if clashes_with_kept || clashes_in_statement {
                conflicts.insert(name.clone());
            }
            claimed.insert(name, descriptor);
        }
    }
    conflicts
}

impl CreateTrafficRuleStatement {
    pub fn create_in(
        &self,
        current: &TrafficRuleConfiguration,
    ) -> RuleResult<TrafficRuleConfiguration> {
        let mut duplicates = repeated_names(&self.segments);
        duplicates.extend(
            self.segments
                .iter()
                .filter(|each| current.find_strategy(&each.name).is_some())
                .map(|each| each.name.clone()),
        );
        if !duplicates.is_empty() {
            return Err(RuleError::DuplicateEntity {
                kind: RuleKind::Traffic,
                names: duplicates.into_iter().collect(),
            });
        }
        let conflicts = conflicting_descriptors(current, &self.segments);
        if !conflicts.is_empty() {
            return Err(RuleError::DuplicateEntity {
                kind: RuleKind::Traffic,
                names: conflicts.into_iter().collect(),
            });
        }

        let mut result = current.clone();
        for segment in &self.segments {
            let strategy = segment.write_into(&mut result);
            result.strategies.push(strategy);
        }
        Ok(result)
    }
}

impl RuleMutation for CreateTrafficRuleStatement {
    fn rule_kind(&self) -> RuleKind {
        RuleKind::Traffic
    }

    fn apply(&self, current: &RuleConfiguration) -> RuleResult<RuleConfiguration> {
        let current = traffic_configuration(current)?;
        Ok(self.create_in(current)?.into())
    }
}
