//! SQL parser rule.

use serde::{Deserialize, Serialize};

use crate::rule::CacheOption;

/// Default parse tree cache: 128 initial entries, 1024 maximum.
pub const DEFAULT_PARSE_TREE_CACHE: CacheOption = CacheOption::new(128, 1024);

/// Default SQL statement cache: 2000 initial entries, 65535 maximum.
pub const DEFAULT_SQL_STATEMENT_CACHE: CacheOption = CacheOption::new(2000, 65535);

/// Parser behaviour shared by every node of the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlParserRuleConfiguration {
    pub sql_comment_parse_enabled: bool,
    pub parse_tree_cache: CacheOption,
    pub sql_statement_cache: CacheOption,
}

impl Default for SqlParserRuleConfiguration {
    fn default() -> Self {
        Self {
            sql_comment_parse_enabled: false,
            parse_tree_cache: DEFAULT_PARSE_TREE_CACHE,
            sql_statement_cache: DEFAULT_SQL_STATEMENT_CACHE,
        }
    }
}

/// Active SQL parser rule.
#[derive(Debug, Clone)]
pub struct SqlParserRule {
    configuration: SqlParserRuleConfiguration,
}

impl SqlParserRule {
    pub fn new(configuration: SqlParserRuleConfiguration) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &SqlParserRuleConfiguration {
        &self.configuration
    }

    pub fn sql_comment_parse_enabled(&self) -> bool {
        self.configuration.sql_comment_parse_enabled
    }
}
