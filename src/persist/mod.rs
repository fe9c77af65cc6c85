//! Metadata persistence subsystem.
//!
//! # Data Flow
//! ```text
//! Mutation published in memory
//!     → next generation, then snapshot of all global rule configurations
//!     → MetadataPersistence::persist(snapshot, overwrite = true)
//!     → store drops it if the origin already stored a newer generation
//!
//! Peer node writes the shared store:
//!     watcher.rs detects change
//!     → reload RulesDocument
//!     → RuleMutationHandler::refresh (skips own and already applied writes,
//!       rebuilds + publishes changed kinds)
//! ```
//!
//! # Design Decisions
//! - The whole collection is written, never a diff
//! - Persistence never runs under a lock held by the handler
//! - Writes from one node may finish out of order; generations keep the newest
//! - A missing gateway (standalone mode) makes persistence a no-op

pub mod file;
pub mod memory;
pub mod watcher;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::rule::RuleConfiguration;

pub use file::FilePersistence;
pub use memory::MemoryPersistence;
pub use watcher::RuleWatcher;

/// Full configuration collection written by one node.
///
/// `generation` increases with every write a node issues, so a store can
/// tell a late, older write from the same node apart from a newer one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSnapshot {
    pub origin: String,
    pub generation: u64,
    pub configurations: Vec<RuleConfiguration>,
}

/// Stored form of the global rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesDocument {
    /// Node whose write produced the current content.
    pub writer: Option<String>,
    /// Highest generation stored per writing node.
    pub generations: BTreeMap<String, u64>,
    pub rules: Vec<RuleConfiguration>,
}

impl RulesDocument {
    /// Highest generation stored for `origin`, 0 if it never wrote.
    pub fn generation_of(&self, origin: &str) -> u64 {
        self.generations.get(origin).copied().unwrap_or(0)
    }

    /// Whether `snapshot` is older than what its origin already stored.
    pub fn supersedes(&self, snapshot: &RuleSnapshot) -> bool {
        self.generations
            .get(&snapshot.origin)
            .is_some_and(|stored| *stored >= snapshot.generation)
    }

    /// Merge a snapshot in. With `overwrite == false`, kinds already stored
    /// are kept as they are.
    pub fn apply(&mut self, snapshot: &RuleSnapshot, overwrite: bool) {
        for config in &snapshot.configurations {
            match self.rules.iter_mut().find(|each| each.kind() == config.kind()) {
                Some(existing) if overwrite => *existing = config.clone(),
                Some(_) => {}
                None => self.rules.push(config.clone()),
            }
        }
        self.rules.sort_by_key(RuleConfiguration::kind);
        self.generations
            .insert(snapshot.origin.clone(), snapshot.generation);
        self.writer = Some(snapshot.origin.clone());
    }
}

/// Durable, cluster-visible store of global rule configurations.
#[async_trait]
pub trait MetadataPersistence: Send + Sync {
    /// Upsert the snapshot's configurations. With `overwrite == false`, kinds
    /// already stored are kept as they are. A snapshot older than one its
    /// origin already stored is dropped and reported as success.
    async fn persist(&self, snapshot: &RuleSnapshot, overwrite: bool) -> Result<(), PersistError>;

    /// The stored document; empty if nothing was written yet.
    async fn load(&self) -> Result<RulesDocument, PersistError>;
}
