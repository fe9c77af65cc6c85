//! End-to-end behaviour of rule mutations.

use std::collections::BTreeSet;

use rule_governor::algorithm::{Algorithm, Properties};
use rule_governor::rule::{AlgorithmDescriptor, CacheOption, SqlParserRuleConfiguration};
use rule_governor::statement::{
    AlterSqlParserRuleStatement, CacheOptionSegment, CreateTrafficRuleStatement,
    DropTrafficRuleStatement, TrafficRuleSegment,
};
use rule_governor::{ErrorKind, RuleError, RuleKind, RuleStatement};

mod common;

fn pick<T>(specified: bool, wanted: T, current: T) -> T {
    if specified {
        wanted
    } else {
        current
    }
}

fn drop_statement(names: &[&str], if_exists: bool) -> DropTrafficRuleStatement {
    DropTrafficRuleStatement {
        rule_names: names.iter().map(|n| n.to_string()).collect(),
        contains_if_exists_clause: if_exists,
    }
}

#[tokio::test]
async fn test_alter_only_comment_flag() {
    let (handler, store) = common::handler();
    let statement = AlterSqlParserRuleStatement {
        sql_comment_parse_enable: Some(true),
        ..Default::default()
    };

    let report = handler.execute(&statement).await.unwrap();
    assert!(report.is_persisted());

    let expected = SqlParserRuleConfiguration {
        sql_comment_parse_enabled: true,
        parse_tree_cache: CacheOption::new(128, 2048),
        sql_statement_cache: CacheOption::new(2000, 65535),
    };
    assert_eq!(common::current_parser(&handler), expected);
    assert_eq!(store.get(RuleKind::SqlParser), Some(expected.into()));
    // the untouched kind is persisted too: full collection, not a diff
    assert_eq!(store.get(RuleKind::Traffic), Some(common::traffic_config().into()));
}

#[tokio::test]
async fn test_merge_keeps_every_unset_field() {
    let current = common::parser_config();
    let wanted = SqlParserRuleConfiguration {
        sql_comment_parse_enabled: true,
        parse_tree_cache: CacheOption::new(1, 2),
        sql_statement_cache: CacheOption::new(3, 4),
    };

    // bit i set => field i specified
    for mask in 0u32..(1 << 5) {
        let set = |bit: u32| mask & (1 << bit) != 0;
        let statement = AlterSqlParserRuleStatement {
            sql_comment_parse_enable: set(0).then_some(wanted.sql_comment_parse_enabled),
            parse_tree_cache: Some(CacheOptionSegment {
                initial_capacity: set(1).then_some(wanted.parse_tree_cache.initial_capacity),
                maximum_size: set(2).then_some(wanted.parse_tree_cache.maximum_size),
            }),
            sql_statement_cache: Some(CacheOptionSegment {
                initial_capacity: set(3).then_some(wanted.sql_statement_cache.initial_capacity),
                maximum_size: set(4).then_some(wanted.sql_statement_cache.maximum_size),
            }),
        };
        let (handler, _) = common::handler();
        handler.execute(&statement).await.unwrap();
        let result = common::current_parser(&handler);

        let expected = SqlParserRuleConfiguration {
            sql_comment_parse_enabled: pick(
                set(0),
                wanted.sql_comment_parse_enabled,
                current.sql_comment_parse_enabled,
            ),
            parse_tree_cache: CacheOption::new(
                pick(
                    set(1),
                    wanted.parse_tree_cache.initial_capacity,
                    current.parse_tree_cache.initial_capacity,
                ),
                pick(
                    set(2),
                    wanted.parse_tree_cache.maximum_size,
                    current.parse_tree_cache.maximum_size,
                ),
            ),
            sql_statement_cache: CacheOption::new(
                pick(
                    set(3),
                    wanted.sql_statement_cache.initial_capacity,
                    current.sql_statement_cache.initial_capacity,
                ),
                pick(
                    set(4),
                    wanted.sql_statement_cache.maximum_size,
                    current.sql_statement_cache.maximum_size,
                ),
            ),
        };
        assert_eq!(result, expected, "mask {mask:#07b}");
    }
}

#[tokio::test]
async fn test_drop_cascades_descriptors() {
    let (handler, store) = common::handler();

    handler.execute(&drop_statement(&["t1"], false)).await.unwrap();

    let traffic = common::current_traffic(&handler);
    assert_eq!(traffic.strategy_names().collect::<Vec<_>>(), vec!["t2"]);
    assert_eq!(traffic.algorithms.keys().collect::<Vec<_>>(), vec!["a2"]);
    assert_eq!(traffic.load_balancers.keys().collect::<Vec<_>>(), vec!["lb1"]);
    assert_eq!(store.get(RuleKind::Traffic), Some(traffic.into()));
}

#[tokio::test]
async fn test_drop_missing_fails_without_mutation() {
    let (handler, store) = common::handler();
    let before = handler.metadata().find(RuleKind::Traffic).unwrap();

    let err = handler
        .execute(&drop_statement(&["t1", "t3"], false))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequiredEntityMissing);
    assert!(matches!(
        &err,
        RuleError::RequiredEntityMissing { kind: RuleKind::Traffic, names }
            if names == &vec!["t3".to_string()]
    ));

    // same instance, same configuration, nothing persisted
    let after = handler.metadata().find(RuleKind::Traffic).unwrap();
    assert!(std::sync::Arc::ptr_eq(&before, &after));
    assert_eq!(common::current_traffic(&handler), common::traffic_config());
    assert_eq!(store.persist_count(), 0);
}

#[tokio::test]
async fn test_drop_if_exists_skips_absent_names() {
    let (handler, _) = common::handler();

    handler
        .execute(&drop_statement(&["t2", "t3"], true))
        .await
        .unwrap();

    let traffic = common::current_traffic(&handler);
    assert_eq!(traffic.strategy_names().collect::<Vec<_>>(), vec!["t1"]);
    assert_eq!(traffic.algorithms.keys().collect::<Vec<_>>(), vec!["a1"]);
}

#[tokio::test]
async fn test_every_drop_keeps_references_intact() {
    let names = ["t1", "t2", "t3"];
    for mask in 0u32..(1 << names.len()) {
        for if_exists in [false, true] {
            let chosen: Vec<&str> = names
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, n)| *n)
                .collect();
            let (handler, _) = common::handler();
            let result = handler.execute(&drop_statement(&chosen, if_exists)).await;

            let traffic = common::current_traffic(&handler);
            if result.is_err() {
                assert!(!if_exists && chosen.contains(&"t3"));
                assert_eq!(traffic, common::traffic_config());
            }
            assert!(traffic.dangling_references().is_empty(), "drop {chosen:?}");
            assert!(traffic.unused_algorithms().is_empty(), "drop {chosen:?}");
            assert!(traffic.unused_load_balancers().is_empty(), "drop {chosen:?}");

            let mut again = traffic.clone();
            assert_eq!(again.remove_unused_descriptors(), 0);
            assert_eq!(again, traffic);
        }
    }
}

#[tokio::test]
async fn test_unknown_algorithm_aborts_before_publish() {
    let (handler, store) = common::handler();
    let statement = RuleStatement::CreateTrafficRule(CreateTrafficRuleStatement {
        segments: vec![TrafficRuleSegment {
            name: "t9".into(),
            labels: BTreeSet::new(),
            algorithm: common::descriptor("NOT_REGISTERED"),
            load_balancer: common::descriptor("RANDOM"),
        }],
    });

    let err = handler.execute(&statement).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownAlgorithmType);
    assert_eq!(common::current_traffic(&handler), common::traffic_config());
    assert_eq!(store.persist_count(), 0);
}

#[tokio::test]
async fn test_create_then_drop_traffic() {
    let (handler, _) = common::handler();
    let create = RuleStatement::CreateTrafficRule(CreateTrafficRuleStatement {
        segments: vec![TrafficRuleSegment {
            name: "sql_match_traffic".into(),
            labels: BTreeSet::from(["OLTP".to_string()]),
            algorithm: common::descriptor("SQL_HINT"),
            load_balancer: common::descriptor("ROUND_ROBIN"),
        }],
    });
    handler.execute(&create).await.unwrap();

    let rule = handler.metadata().find(RuleKind::Traffic).unwrap();
    let strategy = rule.as_traffic().unwrap().find_strategy("sql_match_traffic").unwrap();
    assert_eq!(strategy.load_balancer.type_name(), "ROUND_ROBIN");

    handler
        .execute(&drop_statement(&["sql_match_traffic"], false))
        .await
        .unwrap();
    assert_eq!(common::current_traffic(&handler), common::traffic_config());
}

#[tokio::test]
async fn test_persistence_failure_is_not_rolled_back() {
    let (handler, store) = common::handler();
    store.set_unavailable(true);

    let report = handler
        .execute(&drop_statement(&["t1"], false))
        .await
        .unwrap();
    assert!(!report.is_persisted());
    assert_eq!(
        report.warning.as_ref().map(RuleError::kind),
        Some(ErrorKind::PersistenceFailure)
    );
    assert_eq!(
        common::current_traffic(&handler).strategy_names().collect::<Vec<_>>(),
        vec!["t2"]
    );

    // the next successful persist carries the committed state
    store.set_unavailable(false);
    handler
        .execute(&AlterSqlParserRuleStatement::default())
        .await
        .unwrap();
    assert_eq!(
        store.get(RuleKind::Traffic),
        Some(common::current_traffic(&handler).into())
    );
}

fn sql_match_segment(name: &str, sql: &str) -> TrafficRuleSegment {
    TrafficRuleSegment {
        name: name.into(),
        labels: BTreeSet::from(["OLTP".to_string()]),
        algorithm: AlgorithmDescriptor::new(
            "SQL_MATCH",
            Properties::from([("sql".to_string(), sql.to_string())]),
        ),
        load_balancer: common::descriptor("RANDOM"),
    }
}

#[tokio::test]
async fn test_case_variant_names_keep_descriptors_apart() {
    let (handler, store) = common::handler();
    let create = |name: &str, sql: &str| {
        RuleStatement::CreateTrafficRule(CreateTrafficRuleStatement {
            segments: vec![sql_match_segment(name, sql)],
        })
    };
    handler.execute(&create("X1", "SELECT 1")).await.unwrap();
    let persisted = store.persist_count();

    let err = handler.execute(&create("x1", "SELECT 2")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateEntity);
    assert_eq!(store.persist_count(), persisted);

    // nothing named x1 exists, so the drop fails and X1 is untouched
    let err = handler
        .execute(&drop_statement(&["x1"], false))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequiredEntityMissing);

    let traffic = common::current_traffic(&handler);
    assert_eq!(
        traffic.algorithms["x1_sql_match"].properties().get("sql"),
        Some(&"SELECT 1".to_string())
    );
    let rule = handler.metadata().find(RuleKind::Traffic).unwrap();
    let strategy = rule.as_traffic().unwrap().find_strategy("X1").unwrap();
    assert_eq!(
        strategy.algorithm.properties().get("sql"),
        Some(&"SELECT 1".to_string())
    );
}
