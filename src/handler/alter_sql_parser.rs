//! `ALTER SQL_PARSER RULE`: field-wise merge into the current configuration.

use crate::error::RuleResult;
use crate::handler::{sql_parser_configuration, RuleMutation};
use crate::rule::{CacheOption, RuleConfiguration, RuleKind, SqlParserRuleConfiguration};
use crate::statement::{AlterSqlParserRuleStatement, CacheOptionSegment};

impl CacheOptionSegment {
    /// Take each set field, keep the current value for the rest.
    pub fn merge(&self, current: CacheOption) -> CacheOption {
        CacheOption {
            initial_capacity: self.initial_capacity.unwrap_or(current.initial_capacity),
            maximum_size: self.maximum_size.unwrap_or(current.maximum_size),
        }
    }
}

impl AlterSqlParserRuleStatement {
    pub fn merge(&self, current: &SqlParserRuleConfiguration) -> SqlParserRuleConfiguration {
        SqlParserRuleConfiguration {
            sql_comment_parse_enabled: self
                .sql_comment_parse_enable
                .unwrap_or(current.sql_comment_parse_enabled),
            parse_tree_cache: merge_cache(self.parse_tree_cache.as_ref(), current.parse_tree_cache),
            sql_statement_cache: merge_cache(
                self.sql_statement_cache.as_ref(),
                current.sql_statement_cache,
            ),
        }
    }
}

fn merge_cache(segment: Option<&CacheOptionSegment>, current: CacheOption) -> CacheOption {
    segment.map_or(current, |segment| segment.merge(current))
}

impl RuleMutation for AlterSqlParserRuleStatement {
    fn rule_kind(&self) -> RuleKind {
        RuleKind::SqlParser
    }

    fn apply(&self, current: &RuleConfiguration) -> RuleResult<RuleConfiguration> {
        let current = sql_parser_configuration(current)?;
        Ok(self.merge(current).into())
    }
}
