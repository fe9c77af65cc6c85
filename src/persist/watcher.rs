//! Durable store watcher for cluster refresh.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::persist::file::read_rules;
use crate::persist::RulesDocument;

/// A watcher that monitors the shared rules file for changes.
pub struct RuleWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RulesDocument>,
}

impl RuleWatcher {
    /// Create a new RuleWatcher.
    ///
    /// Returns the watcher and a receiver for reloaded rule documents.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RulesDocument>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching in a background thread. The parent directory is watched
    /// because writers replace the file by rename.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let file_name = self.path.file_name().map(|n| n.to_os_string());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_file && (event.kind.is_modify() || event.kind.is_create()) {
                        tracing::debug!(path = ?path, "Rules file change detected, reloading");
                        match read_rules(&path) {
                            Ok(document) => {
                                let _ = tx.send(document);
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload rules: {}. Keeping current rules.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Rules watcher started");
        Ok(watcher)
    }
}
