//! Built-in traffic algorithms.
//!
//! A traffic algorithm decides whether a statement is diverted to the
//! strategy's compute nodes. Three families exist: hint, segment (SQL text)
//! and transaction.

use std::sync::Arc;

use crate::algorithm::registry::{AlgorithmRegistry, Provider, TrafficCapability};
use crate::algorithm::{require_property, Algorithm, Properties};

/// Family a traffic algorithm belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficFamily {
    Hint,
    Segment,
    Transaction,
}

/// A traffic-matching algorithm instance.
pub trait TrafficAlgorithm: Algorithm {
    fn family(&self) -> TrafficFamily;
}

/// Matches a fixed list of SQL statements.
#[derive(Debug)]
pub struct SqlMatchTrafficAlgorithm {
    props: Properties,
    statements: Vec<String>,
}

impl SqlMatchTrafficAlgorithm {
    /// Normalised statements this algorithm matches.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

#[derive(Debug)]
pub struct SqlHintTrafficAlgorithm {
    props: Properties,
}

#[derive(Debug)]
pub struct SimpleHintTrafficAlgorithm {
    props: Properties,
}

/// Routes whole transactions.
#[derive(Debug)]
pub struct TransactionTrafficAlgorithm {
    props: Properties,
}

macro_rules! impl_algorithm {
    ($ty:ty, $name:literal, $family:expr) => {
        impl Algorithm for $ty {
            fn type_name(&self) -> &'static str {
                $name
            }

            fn properties(&self) -> &Properties {
                &self.props
            }
        }

        impl TrafficAlgorithm for $ty {
            fn family(&self) -> TrafficFamily {
                $family
            }
        }
    };
}

impl_algorithm!(SqlMatchTrafficAlgorithm, "SQL_MATCH", TrafficFamily::Segment);
impl_algorithm!(SqlHintTrafficAlgorithm, "SQL_HINT", TrafficFamily::Hint);
impl_algorithm!(SimpleHintTrafficAlgorithm, "SIMPLE_HINT", TrafficFamily::Hint);
impl_algorithm!(TransactionTrafficAlgorithm, "TRANSACTION", TrafficFamily::Transaction);

/// Split `;`-separated SQL and collapse whitespace so matching is layout-insensitive.
fn normalise_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|each| each.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|each| !each.is_empty())
        .collect()
}

fn sql_match(props: &Properties) -> Result<Arc<dyn TrafficAlgorithm>, String> {
    let statements = normalise_statements(require_property(props, "sql")?);
    Ok(Arc::new(SqlMatchTrafficAlgorithm {
        props: props.clone(),
        statements,
    }))
}

fn sql_hint(props: &Properties) -> Result<Arc<dyn TrafficAlgorithm>, String> {
    Ok(Arc::new(SqlHintTrafficAlgorithm {
        props: props.clone(),
    }))
}

fn simple_hint(props: &Properties) -> Result<Arc<dyn TrafficAlgorithm>, String> {
    if props.is_empty() {
        return Err("at least one hint property is required".to_string());
    }
    Ok(Arc::new(SimpleHintTrafficAlgorithm {
        props: props.clone(),
    }))
}

fn transaction(props: &Properties) -> Result<Arc<dyn TrafficAlgorithm>, String> {
    Ok(Arc::new(TransactionTrafficAlgorithm {
        props: props.clone(),
    }))
}

pub(crate) fn register(registry: &mut AlgorithmRegistry) {
    registry.register::<TrafficCapability>(Provider::new("SQL_MATCH", sql_match));
    registry.register::<TrafficCapability>(Provider::new("SQL_HINT", sql_hint));
    registry.register::<TrafficCapability>(Provider::new("SIMPLE_HINT", simple_hint));
    registry.register::<TrafficCapability>(Provider::new("TRANSACTION", transaction));
}
