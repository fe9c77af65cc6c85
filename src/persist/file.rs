//! File-backed persistence gateway.
//!
//! # Responsibilities
//! - Store the global rule collection as one JSON document
//! - Replace the document atomically (write temp file, then rename)
//! - Read it back for bootstrap and for the watcher
//!
//! Nodes sharing the file (e.g. on a shared volume) see each other's writes
//! through [`RuleWatcher`](crate::persist::RuleWatcher).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::PersistError;
use crate::persist::{MetadataPersistence, RuleSnapshot, RulesDocument};

/// Parse a rules document; an empty file means no rules.
pub fn parse_document(content: &str) -> Result<RulesDocument, PersistError> {
    if content.trim().is_empty() {
        return Ok(RulesDocument::default());
    }
    Ok(serde_json::from_str(content)?)
}

/// Read the rules document synchronously; a missing file means no rules.
pub fn read_rules(path: &Path) -> Result<RulesDocument, PersistError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_document(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RulesDocument::default()),
        Err(e) => Err(e.into()),
    }
}

/// JSON file holding every global rule configuration.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
    // read-merge-write of this process's writes
    write: Arc<Mutex<()>>,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unique per write, so writers sharing the directory never share a temp file.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "rules.json".into());
        name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }

    async fn read(&self) -> Result<RulesDocument, PersistError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => parse_document(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RulesDocument::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl MetadataPersistence for FilePersistence {
    async fn persist(&self, snapshot: &RuleSnapshot, overwrite: bool) -> Result<(), PersistError> {
        let _guard = self.write.lock().await;
        let mut document = self.read().await?;
        if document.supersedes(snapshot) {
            tracing::debug!(
                origin = %snapshot.origin,
                generation = snapshot.generation,
                "Older rule snapshot dropped"
            );
            return Ok(());
        }
        document.apply(snapshot, overwrite);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(&document)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, content).await?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::debug!(
            path = ?self.path,
            generation = snapshot.generation,
            "Rule configurations written"
        );
        Ok(())
    }

    async fn load(&self) -> Result<RulesDocument, PersistError> {
        self.read().await
    }
}
