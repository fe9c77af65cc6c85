//! In-memory persistence gateway.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::PersistError;
use crate::persist::{MetadataPersistence, RuleSnapshot, RulesDocument};
use crate::rule::{RuleConfiguration, RuleKind};

/// A thread-safe store keeping the rules document in process memory.
///
/// Clones share the same storage. Useful as a single-process stand-in for
/// the cluster store and for observing persistence calls.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    document: Arc<Mutex<RulesDocument>>,
    persist_calls: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful `persist` calls.
    pub fn persist_count(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }

    pub fn get(&self, kind: RuleKind) -> Option<RuleConfiguration> {
        let document = self.document().ok()?;
        let found = document.rules.iter().find(|each| each.kind() == kind).cloned();
        found
    }

    /// Replace the stored document, as a peer node writing the store would.
    pub fn put(&self, document: RulesDocument) -> Result<(), PersistError> {
        *self.document()? = document;
        Ok(())
    }

    fn document(&self) -> Result<MutexGuard<'_, RulesDocument>, PersistError> {
        self.document
            .lock()
            .map_err(|_| PersistError::Unavailable("memory store poisoned".into()))
    }

    fn check_available(&self) -> Result<(), PersistError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PersistError::Unavailable("memory store marked unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataPersistence for MemoryPersistence {
    async fn persist(&self, snapshot: &RuleSnapshot, overwrite: bool) -> Result<(), PersistError> {
        self.check_available()?;
        {
            let mut document = self.document()?;
            if !document.supersedes(snapshot) {
                document.apply(snapshot, overwrite);
            }
        }
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self) -> Result<RulesDocument, PersistError> {
        self.check_available()?;
        Ok(self.document()?.clone())
    }
}
