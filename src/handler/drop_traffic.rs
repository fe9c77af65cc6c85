//! `DROP TRAFFIC RULE [IF EXISTS]`: remove strategies, then cascade-clean
//! descriptors nothing references any more.

use crate::error::{RuleError, RuleResult};
use crate::handler::{traffic_configuration, RuleMutation};
use crate::rule::{RuleConfiguration, RuleKind, TrafficRuleConfiguration};
use crate::statement::DropTrafficRuleStatement;

impl DropTrafficRuleStatement {
    /// Requested names with no matching strategy, sorted.
    pub fn missing_names(&self, current: &TrafficRuleConfiguration) -> Vec<String> {
        self.rule_names
            .iter()
            .filter(|name| current.find_strategy(name).is_none())
            .cloned()
            .collect()
    }

    pub fn drop_from(
        &self,
        current: &TrafficRuleConfiguration,
    ) -> RuleResult<TrafficRuleConfiguration> {
        if !self.contains_if_exists_clause {
            let missing = self.missing_names(current);
            if !missing.is_empty() {
                return Err(RuleError::RequiredEntityMissing {
                    kind: RuleKind::Traffic,
                    names: missing,
                });
            }
        }

        let mut result = current.clone();
        result
            .strategies
            .retain(|each| !self.rule_names.contains(&each.name));
        result.remove_unused_descriptors();
        Ok(result)
    }
}

impl RuleMutation for DropTrafficRuleStatement {
    fn rule_kind(&self) -> RuleKind {
        RuleKind::Traffic
    }

    fn apply(&self, current: &RuleConfiguration) -> RuleResult<RuleConfiguration> {
        let current = traffic_configuration(current)?;
        Ok(self.drop_from(current)?.into())
    }
}
