//! Immutable value objects shared by rule configurations.

use serde::{Deserialize, Serialize};

use crate::algorithm::Properties;

/// How to build an algorithm instance: a type name plus properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmDescriptor {
    #[serde(rename = "type")]
    type_name: String,

    #[serde(default, rename = "props")]
    properties: Properties,
}

impl AlgorithmDescriptor {
    pub fn new(type_name: impl Into<String>, properties: Properties) -> Self {
        Self {
            type_name: type_name.into(),
            properties,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

/// Capacity settings of a parser cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOption {
    pub initial_capacity: u32,
    pub maximum_size: u64,
}

impl CacheOption {
    pub const fn new(initial_capacity: u32, maximum_size: u64) -> Self {
        Self {
            initial_capacity,
            maximum_size,
        }
    }
}
