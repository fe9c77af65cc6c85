//! Global rule metadata: the node-local working set of active rules.
//!
//! # Responsibilities
//! - Hold at most one active rule per kind
//! - Publish a replacement rule as a single atomic visible write
//! - Serialize mutations of the same kind
//!
//! # Design Decisions
//! - One `ArcSwapOption` per kind: readers load lock-free and see either the
//!   old or the new rule, never a mix
//! - Per-kind async mutex guards fetch → compute → publish; kinds are independent
//! - The mutex is never needed to read

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::{Mutex, MutexGuard};

use crate::rule::{GlobalRule, RuleConfiguration, RuleKind};

#[derive(Debug, Default)]
struct RuleSlot {
    current: ArcSwapOption<GlobalRule>,
    mutation: Mutex<()>,
}

/// Active rules keyed by kind.
#[derive(Debug)]
pub struct GlobalRuleMetaData {
    slots: [RuleSlot; RuleKind::ALL.len()],
}

impl Default for GlobalRuleMetaData {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalRuleMetaData {
    /// Create metadata with every kind absent.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| RuleSlot::default()),
        }
    }

    /// Create metadata from already built rules. A later rule of the same
    /// kind replaces an earlier one.
    pub fn from_rules(rules: impl IntoIterator<Item = GlobalRule>) -> Self {
        let metadata = Self::new();
        for rule in rules {
            metadata.publish(rule);
        }
        metadata
    }

    fn slot(&self, kind: RuleKind) -> &RuleSlot {
        &self.slots[kind.index()]
    }

    /// Current rule of a kind.
    pub fn find(&self, kind: RuleKind) -> Option<Arc<GlobalRule>> {
        self.slot(kind).current.load_full()
    }

    pub fn contains(&self, kind: RuleKind) -> bool {
        self.slot(kind).current.load().is_some()
    }

    /// Replace the rule of its kind, returning the previous one.
    pub fn publish(&self, rule: GlobalRule) -> Option<Arc<GlobalRule>> {
        let kind = rule.kind();
        let previous = self.slot(kind).current.swap(Some(Arc::new(rule)));
        tracing::info!(rule_kind = %kind, replaced = previous.is_some(), "Global rule published");
        previous
    }

    /// Acquire the mutation lock of a kind. Held across fetch, compute and
    /// publish; released before persistence.
    pub async fn lock(&self, kind: RuleKind) -> MutexGuard<'_, ()> {
        self.slot(kind).mutation.lock().await
    }

    /// Snapshot of every present configuration, ordered by kind.
    pub fn configurations(&self) -> Vec<RuleConfiguration> {
        RuleKind::ALL
            .into_iter()
            .filter_map(|kind| self.find(kind))
            .map(|rule| rule.configuration())
            .collect()
    }

    /// Kinds currently present.
    pub fn kinds(&self) -> Vec<RuleKind> {
        RuleKind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{SqlParserRule, SqlParserRuleConfiguration};

    fn parser_rule(enabled: bool) -> GlobalRule {
        GlobalRule::SqlParser(SqlParserRule::new(SqlParserRuleConfiguration {
            sql_comment_parse_enabled: enabled,
            ..Default::default()
        }))
    }

    #[test]
    fn test_publish_replaces_kind() {
        let metadata = GlobalRuleMetaData::new();
        assert!(metadata.find(RuleKind::SqlParser).is_none());

        assert!(metadata.publish(parser_rule(false)).is_none());
        let previous = metadata.publish(parser_rule(true)).unwrap();
        assert!(!previous.as_sql_parser().unwrap().sql_comment_parse_enabled());

        let current = metadata.find(RuleKind::SqlParser).unwrap();
        assert!(current.as_sql_parser().unwrap().sql_comment_parse_enabled());
        assert_eq!(metadata.kinds(), vec![RuleKind::SqlParser]);
        assert_eq!(metadata.configurations().len(), 1);
    }

    #[test]
    fn test_reader_keeps_old_snapshot() {
        let metadata = GlobalRuleMetaData::from_rules([parser_rule(false)]);
        let held = metadata.find(RuleKind::SqlParser).unwrap();
        metadata.publish(parser_rule(true));
        assert!(!held.as_sql_parser().unwrap().sql_comment_parse_enabled());
    }

    #[tokio::test]
    async fn test_lock_is_per_kind() {
        let metadata = GlobalRuleMetaData::new();
        let _parser = metadata.lock(RuleKind::SqlParser).await;
        // a different kind is not blocked
        let traffic = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            metadata.lock(RuleKind::Traffic),
        )
        .await;
        assert!(traffic.is_ok());
    }
}
