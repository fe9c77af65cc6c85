//! Rule mutation subsystem.
//!
//! # Data Flow
//! ```text
//! RuleStatement (already parsed)
//!     → lock rule kind
//!     → fetch current rule (PreconditionFailure if absent)
//!     → RuleMutation::apply (merge / subtract + cascade cleanup)
//!     → GlobalRule::build (algorithm resolution, invariant checks)
//!     → GlobalRuleMetaData::publish (atomic swap)
//!     → unlock rule kind
//!     → persist full collection (best effort, reported as warning)
//! ```
//!
//! # Design Decisions
//! - Every validation happens before publish: failures leave no trace
//! - Persistence failure never rolls back the published rule
//! - No lock is held across persistence I/O; a stuck store write delays only
//!   the mutation that issued it
//! - Each write carries a generation taken before its snapshot, so the highest
//!   generation always holds the newest in-memory state and stores drop older
//!   writes that finish late
//! - Refresh ignores this node's own writes and peer writes already applied

pub mod alter_sql_parser;
pub mod alter_traffic;
pub mod create_traffic;
pub mod drop_traffic;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::algorithm::AlgorithmRegistry;
use crate::error::{PersistError, RuleError, RuleResult};
use crate::observability::metrics;
use crate::persist::{MetadataPersistence, RuleSnapshot, RulesDocument};
use crate::rule::{
    GlobalRule, GlobalRuleMetaData, RuleConfiguration, RuleKind, SqlParserRuleConfiguration,
    TrafficRuleConfiguration,
};
use crate::statement::RuleStatement;

/// A statement that computes a new configuration for one rule kind.
pub trait RuleMutation: Send + Sync {
    fn rule_kind(&self) -> RuleKind;

    /// Compute the replacement configuration. Must be pure: the current
    /// configuration is only read.
    fn apply(&self, current: &RuleConfiguration) -> RuleResult<RuleConfiguration>;
}

impl RuleMutation for RuleStatement {
    fn rule_kind(&self) -> RuleKind {
        RuleStatement::rule_kind(self)
    }

    fn apply(&self, current: &RuleConfiguration) -> RuleResult<RuleConfiguration> {
        match self {
            RuleStatement::AlterSqlParserRule(statement) => statement.apply(current),
            RuleStatement::CreateTrafficRule(statement) => statement.apply(current),
            RuleStatement::AlterTrafficRule(statement) => statement.apply(current),
            RuleStatement::DropTrafficRule(statement) => statement.apply(current),
        }
    }
}

pub(crate) fn sql_parser_configuration(
    current: &RuleConfiguration,
) -> RuleResult<&SqlParserRuleConfiguration> {
    match current {
        RuleConfiguration::SqlParser(config) => Ok(config),
        _ => Err(RuleError::PreconditionFailure(RuleKind::SqlParser)),
    }
}

pub(crate) fn traffic_configuration(
    current: &RuleConfiguration,
) -> RuleResult<&TrafficRuleConfiguration> {
    match current {
        RuleConfiguration::Traffic(config) => Ok(config),
        _ => Err(RuleError::PreconditionFailure(RuleKind::Traffic)),
    }
}

/// Outcome of a successful mutation.
#[derive(Debug)]
pub struct MutationReport {
    pub rule_kind: RuleKind,
    /// Configuration now active on this node.
    pub configuration: RuleConfiguration,
    /// Set when the in-memory change is committed but persistence failed.
    pub warning: Option<RuleError>,
}

impl MutationReport {
    pub fn is_persisted(&self) -> bool {
        self.warning.is_none()
    }
}

/// Executes rule mutations against the node's global rule metadata.
pub struct RuleMutationHandler {
    metadata: Arc<GlobalRuleMetaData>,
    registry: Arc<AlgorithmRegistry>,
    persistence: Option<Arc<dyn MetadataPersistence>>,
    /// Node id written with every snapshot.
    origin: String,
    /// Generation of the last snapshot issued.
    generation: AtomicU64,
    /// Highest generation applied from each peer's writes.
    applied: DashMap<String, u64>,
}

impl RuleMutationHandler {
    /// `persistence == None` means standalone mode: nothing is written.
    pub fn new(
        metadata: Arc<GlobalRuleMetaData>,
        registry: Arc<AlgorithmRegistry>,
        persistence: Option<Arc<dyn MetadataPersistence>>,
    ) -> Self {
        Self {
            metadata,
            registry,
            persistence,
            origin: uuid::Uuid::new_v4().to_string(),
            generation: AtomicU64::new(0),
            applied: DashMap::new(),
        }
    }

    /// Write snapshots as node `origin`, continuing after `generation`.
    pub fn with_origin(mut self, origin: impl Into<String>, generation: u64) -> Self {
        self.origin = origin.into();
        self.generation = AtomicU64::new(generation);
        self
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn metadata(&self) -> &Arc<GlobalRuleMetaData> {
        &self.metadata
    }

    pub fn registry(&self) -> &Arc<AlgorithmRegistry> {
        &self.registry
    }

    /// Run a mutation end to end.
    pub async fn execute(&self, statement: &dyn RuleMutation) -> RuleResult<MutationReport> {
        let kind = statement.rule_kind();
        let configuration = match self.publish(statement).await {
            Ok(configuration) => configuration,
            Err(e) => {
                tracing::warn!(rule_kind = %kind, error = %e, "Rule mutation rejected");
                metrics::record_mutation(kind, "rejected");
                return Err(e);
            }
        };

        let warning = match self.persist().await {
            Ok(()) => {
                metrics::record_mutation(kind, "committed");
                None
            }
            Err(e) => {
                tracing::warn!(
                    rule_kind = %kind,
                    error = %e,
                    "Rule published locally but persistence failed"
                );
                metrics::record_mutation(kind, "committed_unpersisted");
                metrics::record_persist_failure(kind);
                Some(RuleError::Persistence(e))
            }
        };

        Ok(MutationReport {
            rule_kind: kind,
            configuration,
            warning,
        })
    }

    /// Fetch, compute, build and publish under the kind's mutation lock.
    async fn publish(&self, statement: &dyn RuleMutation) -> RuleResult<RuleConfiguration> {
        let kind = statement.rule_kind();
        let _guard = self.metadata.lock(kind).await;

        let current = self
            .metadata
            .find(kind)
            .ok_or(RuleError::PreconditionFailure(kind))?;
        tracing::debug!(rule_kind = %kind, "Computing new rule configuration");

        let configuration = statement.apply(&current.configuration())?;
        let rule = GlobalRule::build(configuration.clone(), &self.registry)?;
        self.metadata.publish(rule);
        Ok(configuration)
    }

    /// Write a snapshot of every global rule configuration.
    async fn persist(&self) -> Result<(), PersistError> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        // taken before the snapshot: a higher generation never misses a
        // publish whose write was issued earlier
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = RuleSnapshot {
            origin: self.origin.clone(),
            generation,
            configurations: self.metadata.configurations(),
        };
        persistence.persist(&snapshot, true).await
    }

    /// Apply a store document written by another node. Kinds whose
    /// configuration is unchanged or fails to build are left alone. Returns
    /// the kinds that were replaced.
    pub async fn refresh(&self, document: RulesDocument) -> Vec<RuleKind> {
        if let Some(writer) = &document.writer {
            if *writer == self.origin {
                tracing::debug!("Skipping refresh from own write");
                return Vec::new();
            }
            let generation = document.generation_of(writer);
            if self
                .applied
                .get(writer)
                .is_some_and(|applied| *applied >= generation)
            {
                tracing::debug!(writer = %writer, generation, "Peer write already applied");
                return Vec::new();
            }
            self.applied.insert(writer.clone(), generation);
        }

        let mut refreshed = Vec::new();
        for configuration in document.rules {
            let kind = configuration.kind();
            let _guard = self.metadata.lock(kind).await;

            let unchanged = self
                .metadata
                .find(kind)
                .is_some_and(|rule| rule.configuration() == configuration);
            if unchanged {
                continue;
            }
            match GlobalRule::build(configuration, &self.registry) {
                Ok(rule) => {
                    self.metadata.publish(rule);
                    metrics::record_mutation(kind, "refreshed");
                    refreshed.push(kind);
                }
                Err(e) => {
                    tracing::error!(
                        rule_kind = %kind,
                        error = %e,
                        "Ignoring unusable rule configuration from store"
                    );
                }
            }
        }
        refreshed
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::ErrorKind;
    use crate::persist::MemoryPersistence;
    use crate::rule::SqlParserRule;
    use crate::statement::{AlterSqlParserRuleStatement, DropTrafficRuleStatement};

    fn handler_with(rules: Vec<GlobalRule>, store: &MemoryPersistence) -> RuleMutationHandler {
        RuleMutationHandler::new(
            Arc::new(GlobalRuleMetaData::from_rules(rules)),
            Arc::new(AlgorithmRegistry::with_builtin()),
            Some(Arc::new(store.clone())),
        )
    }

    fn parser_and_traffic() -> Vec<GlobalRule> {
        vec![
            GlobalRule::SqlParser(SqlParserRule::new(Default::default())),
            GlobalRule::build(
                TrafficRuleConfiguration::default().into(),
                &AlgorithmRegistry::new(),
            )
            .unwrap(),
        ]
    }

    fn comments(enabled: bool) -> AlterSqlParserRuleStatement {
        AlterSqlParserRuleStatement {
            sql_comment_parse_enable: Some(enabled),
            ..Default::default()
        }
    }

    fn comments_enabled(handler: &RuleMutationHandler) -> bool {
        handler
            .metadata()
            .find(RuleKind::SqlParser)
            .unwrap()
            .as_sql_parser()
            .unwrap()
            .sql_comment_parse_enabled()
    }

    fn peer_document(writer: &str, generation: u64, enabled: bool) -> RulesDocument {
        RulesDocument {
            writer: Some(writer.to_string()),
            generations: BTreeMap::from([(writer.to_string(), generation)]),
            rules: vec![SqlParserRuleConfiguration {
                sql_comment_parse_enabled: enabled,
                ..Default::default()
            }
            .into()],
        }
    }

    /// Never completes its first write.
    #[derive(Default)]
    struct StuckFirstWrite {
        calls: AtomicUsize,
        entered: Notify,
    }

    #[async_trait]
    impl MetadataPersistence for StuckFirstWrite {
        async fn persist(
            &self,
            _snapshot: &RuleSnapshot,
            _overwrite: bool,
        ) -> Result<(), PersistError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.entered.notify_one();
                std::future::pending::<()>().await;
            }
            Ok(())
        }

        async fn load(&self) -> Result<RulesDocument, PersistError> {
            Ok(RulesDocument::default())
        }
    }

    #[tokio::test]
    async fn test_absent_kind_is_precondition_failure() {
        let store = MemoryPersistence::new();
        let handler = handler_with(Vec::new(), &store);

        let err = handler.execute(&comments(true)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailure);
        assert_eq!(store.persist_count(), 0);
        assert!(handler.metadata().find(RuleKind::SqlParser).is_none());
    }

    #[tokio::test]
    async fn test_persists_full_collection() {
        let store = MemoryPersistence::new();
        let handler = handler_with(parser_and_traffic(), &store).with_origin("node-a", 0);

        let report = handler.execute(&comments(true)).await.unwrap();
        assert!(report.is_persisted());
        assert_eq!(store.persist_count(), 1);

        let document = store.load().await.unwrap();
        assert_eq!(document.rules, handler.metadata().configurations());
        assert_eq!(document.writer.as_deref(), Some("node-a"));
        assert_eq!(document.generation_of("node-a"), 1);
    }

    #[tokio::test]
    async fn test_generation_continues_after_restart() {
        let store = MemoryPersistence::new();
        let handler = handler_with(parser_and_traffic(), &store).with_origin("node-a", 41);

        handler.execute(&comments(true)).await.unwrap();
        assert_eq!(store.load().await.unwrap().generation_of("node-a"), 42);
    }

    #[tokio::test]
    async fn test_standalone_skips_persistence() {
        let handler = RuleMutationHandler::new(
            Arc::new(GlobalRuleMetaData::from_rules([GlobalRule::SqlParser(
                SqlParserRule::new(Default::default()),
            )])),
            Arc::new(AlgorithmRegistry::with_builtin()),
            None,
        );
        let report = handler.execute(&comments(true)).await.unwrap();
        assert!(report.is_persisted());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stuck_write_does_not_block_other_mutations() {
        let store = Arc::new(StuckFirstWrite::default());
        let handler = Arc::new(RuleMutationHandler::new(
            Arc::new(GlobalRuleMetaData::from_rules(parser_and_traffic())),
            Arc::new(AlgorithmRegistry::with_builtin()),
            Some(store.clone()),
        ));

        let stuck = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.execute(&comments(true)).await })
        };
        store.entered.notified().await;
        // the parser change is already visible
        assert!(comments_enabled(&handler));

        let drop = DropTrafficRuleStatement {
            contains_if_exists_clause: true,
            ..Default::default()
        };
        let report = tokio::time::timeout(Duration::from_secs(2), handler.execute(&drop))
            .await
            .expect("traffic mutation finished while the parser write hangs")
            .unwrap();
        assert!(report.is_persisted());

        let disable = comments(false);
        let parser = tokio::time::timeout(Duration::from_secs(2), handler.execute(&disable))
            .await
            .expect("same-kind mutation finished while an earlier write hangs")
            .unwrap();
        assert!(parser.is_persisted());
        assert!(!comments_enabled(&handler));

        assert!(!stuck.is_finished());
        stuck.abort();
    }

    #[tokio::test]
    async fn test_refresh_applies_changed_kinds_only() {
        let store = MemoryPersistence::new();
        let handler = handler_with(
            vec![GlobalRule::SqlParser(SqlParserRule::new(Default::default()))],
            &store,
        );

        assert!(handler.refresh(peer_document("peer", 1, false)).await.is_empty());

        let refreshed = handler.refresh(peer_document("peer", 2, true)).await;
        assert_eq!(refreshed, vec![RuleKind::SqlParser]);
        assert!(comments_enabled(&handler));
        // refresh never writes back to the store
        assert_eq!(store.persist_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_skips_applied_peer_generations() {
        let store = MemoryPersistence::new();
        let handler = handler_with(parser_and_traffic(), &store);

        handler.refresh(peer_document("peer", 3, true)).await;
        handler.execute(&comments(false)).await.unwrap();

        // the same peer document read again must not undo the local change
        assert!(handler.refresh(peer_document("peer", 3, true)).await.is_empty());
        assert!(!comments_enabled(&handler));

        // a newer peer write still applies
        assert_eq!(
            handler.refresh(peer_document("peer", 4, true)).await,
            vec![RuleKind::SqlParser]
        );
    }

    #[tokio::test]
    async fn test_own_write_read_back_late_keeps_newer_state() {
        let store = MemoryPersistence::new();
        let handler = handler_with(parser_and_traffic(), &store).with_origin("node-a", 0);

        // first mutation reaches the store, the second one only memory
        handler.execute(&comments(true)).await.unwrap();
        store.set_unavailable(true);
        let report = handler.execute(&comments(false)).await.unwrap();
        assert!(!report.is_persisted());
        store.set_unavailable(false);

        // the watcher delivers the first write after the second publish
        let late = store.load().await.unwrap();
        assert_eq!(late.writer.as_deref(), Some("node-a"));
        assert!(handler.refresh(late).await.is_empty());
        assert!(!comments_enabled(&handler));

        // the next write carries the second mutation
        handler
            .execute(&AlterSqlParserRuleStatement::default())
            .await
            .unwrap();
        assert_eq!(
            store.get(RuleKind::SqlParser),
            Some(
                SqlParserRuleConfiguration {
                    sql_comment_parse_enabled: false,
                    ..Default::default()
                }
                .into()
            )
        );
    }
}
