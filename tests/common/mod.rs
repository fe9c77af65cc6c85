//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use rule_governor::algorithm::Properties;
use rule_governor::persist::MemoryPersistence;
use rule_governor::rule::{
    AlgorithmDescriptor, CacheOption, SqlParserRuleConfiguration, TrafficRuleConfiguration,
    TrafficStrategyConfiguration,
};
use rule_governor::{
    AlgorithmRegistry, GlobalRule, GlobalRuleMetaData, RuleConfiguration, RuleMutationHandler,
};

pub fn descriptor(type_name: &str) -> AlgorithmDescriptor {
    AlgorithmDescriptor::new(type_name, Properties::new())
}

pub fn strategy(name: &str, algorithm: &str, lb: &str) -> TrafficStrategyConfiguration {
    TrafficStrategyConfiguration {
        name: name.to_string(),
        labels: BTreeSet::from(["OLAP".to_string()]),
        algorithm_name: algorithm.to_string(),
        load_balancer_name: lb.to_string(),
    }
}

/// `{false, (128,2048), (2000,65535)}`
pub fn parser_config() -> SqlParserRuleConfiguration {
    SqlParserRuleConfiguration {
        sql_comment_parse_enabled: false,
        parse_tree_cache: CacheOption::new(128, 2048),
        sql_statement_cache: CacheOption::new(2000, 65535),
    }
}

/// strategies `[{t1,a1,lb1},{t2,a2,lb1}]`, algorithms `{a1,a2}`, load balancers `{lb1}`
pub fn traffic_config() -> TrafficRuleConfiguration {
    TrafficRuleConfiguration {
        strategies: vec![strategy("t1", "a1", "lb1"), strategy("t2", "a2", "lb1")],
        algorithms: BTreeMap::from([
            ("a1".to_string(), descriptor("SQL_HINT")),
            ("a2".to_string(), descriptor("TRANSACTION")),
        ]),
        load_balancers: BTreeMap::from([("lb1".to_string(), descriptor("RANDOM"))]),
    }
}

/// Handler over the sample rules, persisting into a fresh memory store.
pub fn handler() -> (RuleMutationHandler, MemoryPersistence) {
    handler_with(parser_config(), traffic_config())
}

pub fn handler_with(
    parser: SqlParserRuleConfiguration,
    traffic: TrafficRuleConfiguration,
) -> (RuleMutationHandler, MemoryPersistence) {
    let registry = Arc::new(AlgorithmRegistry::with_builtin());
    let rules = [RuleConfiguration::from(parser), RuleConfiguration::from(traffic)]
        .into_iter()
        .map(|config| GlobalRule::build(config, &registry).unwrap());
    let store = MemoryPersistence::new();
    let handler = RuleMutationHandler::new(
        Arc::new(GlobalRuleMetaData::from_rules(rules)),
        registry,
        Some(Arc::new(store.clone())),
    );
    (handler, store)
}

pub fn current_parser(handler: &RuleMutationHandler) -> SqlParserRuleConfiguration {
    *handler
        .metadata()
        .find(rule_governor::RuleKind::SqlParser)
        .unwrap()
        .as_sql_parser()
        .unwrap()
        .configuration()
}

pub fn current_traffic(handler: &RuleMutationHandler) -> TrafficRuleConfiguration {
    handler
        .metadata()
        .find(rule_governor::RuleKind::Traffic)
        .unwrap()
        .as_traffic()
        .unwrap()
        .configuration()
        .clone()
}

/// A fresh directory under the system temp dir.
pub fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rule-governor-it-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
