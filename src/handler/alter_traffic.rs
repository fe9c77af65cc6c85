//! `ALTER TRAFFIC RULE`: replace existing strategies by name.

use crate::error::{RuleError, RuleResult};
use crate::handler::create_traffic::{conflicting_descriptors, repeated_names};
use crate::handler::{traffic_configuration, RuleMutation};
use crate::rule::{RuleConfiguration, RuleKind, TrafficRuleConfiguration};
use crate::statement::AlterTrafficRuleStatement;

impl AlterTrafficRuleStatement {
    pub fn alter_in(
        &self,
        current: &TrafficRuleConfiguration,
    ) -> RuleResult<TrafficRuleConfiguration> {
        let repeated = repeated_names(&self.segments);
        if !repeated.is_empty() {
            return Err(RuleError::DuplicateEntity {
                kind: RuleKind::Traffic,
                names: repeated.into_iter().collect(),
            });
        }
        let mut missing: Vec<String> = self
            .segments
            .iter()
            .filter(|each| current.find_strategy(&each.name).is_none())
            .map(|each| each.name.clone())
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(RuleError::RequiredEntityMissing {
                kind: RuleKind::Traffic,
                names: missing,
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
            if let Some(slot) = result
                .strategies
                .iter_mut()
                .find(|each| each.name == strategy.name)
            {
                *slot = strategy;
            }
        }
        result.remove_unused_descriptors();
        Ok(result)
    }
}

impl RuleMutation for AlterTrafficRuleStatement {
    fn rule_kind(&self) -> RuleKind {
        RuleKind::Traffic
    }

    fn apply(&self, current: &RuleConfiguration) -> RuleResult<RuleConfiguration> {
        let current = traffic_configuration(current)?;
        Ok(self.alter_in(current)?.into())
    }
}
