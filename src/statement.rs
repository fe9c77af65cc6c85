//! Administrative statements, as delivered by the statement parser.
//!
//! Every optional field is an explicit "unset" (`None`), never a default
//! value, so merging can tell "keep current" apart from "set to zero".

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::rule::{AlgorithmDescriptor, RuleKind};

/// Partial cache option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptionSegment {
    pub initial_capacity: Option<u32>,
    pub maximum_size: Option<u64>,
}

/// `ALTER SQL_PARSER RULE ...`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlterSqlParserRuleStatement {
    pub sql_comment_parse_enable: Option<bool>,
    pub parse_tree_cache: Option<CacheOptionSegment>,
    pub sql_statement_cache: Option<CacheOptionSegment>,
}

/// One strategy definition inside a create/alter traffic statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficRuleSegment {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    pub algorithm: AlgorithmDescriptor,
    pub load_balancer: AlgorithmDescriptor,
}

/// `CREATE TRAFFIC RULE ...`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTrafficRuleStatement {
    pub segments: Vec<TrafficRuleSegment>,
}

/// `ALTER TRAFFIC RULE ...`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterTrafficRuleStatement {
    pub segments: Vec<TrafficRuleSegment>,
}

/// `DROP TRAFFIC RULE [IF EXISTS] name, ...`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTrafficRuleStatement {
    pub rule_names: BTreeSet<String>,
    #[serde(default)]
    pub contains_if_exists_clause: bool,
}

/// Any statement the mutation handler accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "statement", rename_all = "snake_case")]
pub enum RuleStatement {
    AlterSqlParserRule(AlterSqlParserRuleStatement),
    CreateTrafficRule(CreateTrafficRuleStatement),
    AlterTrafficRule(AlterTrafficRuleStatement),
    DropTrafficRule(DropTrafficRuleStatement),
}

impl RuleStatement {
    pub fn rule_kind(&self) -> RuleKind {
        match self {
            RuleStatement::AlterSqlParserRule(_) => RuleKind::SqlParser,
            RuleStatement::CreateTrafficRule(_)
            | RuleStatement::AlterTrafficRule(_)
            | RuleStatement::DropTrafficRule(_) => RuleKind::Traffic,
        }
    }
}
