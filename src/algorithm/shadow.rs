//! Built-in shadow algorithms.
//!
//! Hint algorithms mark a whole statement as shadow traffic; column
//! algorithms decide per column value. Only construction and property
//! checks live here, routing is done by the execution engine.

use std::sync::Arc;

use regex::Regex;

use crate::algorithm::registry::{AlgorithmRegistry, Provider, ShadowCapability};
use crate::algorithm::{require_property, Algorithm, Properties};

/// Column operations a column shadow algorithm applies to.
const OPERATIONS: [&str; 3] = ["insert", "update", "delete"];

/// A shadow-routing algorithm instance.
pub trait ShadowAlgorithm: Algorithm {
    /// Column inspected by the algorithm, `None` for hint algorithms.
    fn shadow_column(&self) -> Option<&str>;
}

/// Reads shadow hints from SQL comments.
#[derive(Debug)]
pub struct SqlHintShadowAlgorithm {
    props: Properties,
}

/// Reads shadow hints from the session hint manager.
#[derive(Debug)]
pub struct SimpleHintShadowAlgorithm {
    props: Properties,
}

/// Matches a column value against a regular expression.
#[derive(Debug)]
pub struct ColumnRegexMatchShadowAlgorithm {
    props: Properties,
    column: String,
    regex: Regex,
}

impl ColumnRegexMatchShadowAlgorithm {
    /// Whether a column value marks the row as shadow data.
    pub fn is_shadow_value(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// Matches a column value against a literal.
#[derive(Debug)]
pub struct ColumnValueMatchShadowAlgorithm {
    props: Properties,
    column: String,
}

macro_rules! impl_algorithm {
    ($ty:ty, $name:literal) => {
        impl Algorithm for $ty {
            fn type_name(&self) -> &'static str {
                $name
            }

            fn properties(&self) -> &Properties {
                &self.props
            }
        }
    };
}

impl_algorithm!(SqlHintShadowAlgorithm, "SQL_HINT");
impl_algorithm!(SimpleHintShadowAlgorithm, "SIMPLE_HINT");
impl_algorithm!(ColumnRegexMatchShadowAlgorithm, "REGEX_MATCH");
impl_algorithm!(ColumnValueMatchShadowAlgorithm, "VALUE_MATCH");

impl ShadowAlgorithm for SqlHintShadowAlgorithm {
    fn shadow_column(&self) -> Option<&str> {
        None
    }
}

impl ShadowAlgorithm for SimpleHintShadowAlgorithm {
    fn shadow_column(&self) -> Option<&str> {
        None
    }
}

impl ShadowAlgorithm for ColumnRegexMatchShadowAlgorithm {
    fn shadow_column(&self) -> Option<&str> {
        Some(&self.column)
    }
}

impl ShadowAlgorithm for ColumnValueMatchShadowAlgorithm {
    fn shadow_column(&self) -> Option<&str> {
        Some(&self.column)
    }
}

fn check_operation(props: &Properties) -> Result<(), String> {
    let operation = require_property(props, "operation")?;
    if OPERATIONS.contains(&operation.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(format!("operation `{}` is not one of {:?}", operation, OPERATIONS))
    }
}

fn sql_hint(props: &Properties) -> Result<Arc<dyn ShadowAlgorithm>, String> {
    Ok(Arc::new(SqlHintShadowAlgorithm {
        props: props.clone(),
    }))
}

fn simple_hint(props: &Properties) -> Result<Arc<dyn ShadowAlgorithm>, String> {
    if props.is_empty() {
        return Err("at least one hint property is required".to_string());
    }
    Ok(Arc::new(SimpleHintShadowAlgorithm {
        props: props.clone(),
    }))
}

fn regex_match(props: &Properties) -> Result<Arc<dyn ShadowAlgorithm>, String> {
    let column = require_property(props, "column")?.to_string();
    check_operation(props)?;
    let pattern = require_property(props, "regex")?;
    let regex = Regex::new(pattern).map_err(|e| format!("invalid regex `{}`: {}", pattern, e))?;
    Ok(Arc::new(ColumnRegexMatchShadowAlgorithm {
        props: props.clone(),
        column,
        regex,
    }))
}

fn value_match(props: &Properties) -> Result<Arc<dyn ShadowAlgorithm>, String> {
    let column = require_property(props, "column")?.to_string();
    check_operation(props)?;
    require_property(props, "value")?;
    Ok(Arc::new(ColumnValueMatchShadowAlgorithm {
        props: props.clone(),
        column,
    }))
}

pub(crate) fn register(registry: &mut AlgorithmRegistry) {
    registry.register::<ShadowCapability>(Provider::new("SQL_HINT", sql_hint));
    registry.register::<ShadowCapability>(Provider::new("SIMPLE_HINT", simple_hint));
    registry.register::<ShadowCapability>(Provider::new("REGEX_MATCH", regex_match));
    registry.register::<ShadowCapability>(Provider::new("VALUE_MATCH", value_match));
}
