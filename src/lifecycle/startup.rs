//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the algorithm registry
//! - Open the durable store and load stored rules
//! - Seed kinds the store does not hold yet
//! - Start the store watcher in cluster mode

use std::sync::Arc;

use notify::RecommendedWatcher;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::algorithm::AlgorithmRegistry;
use crate::config::schema::{NodeConfig, NodeMode};
use crate::error::{PersistError, RuleError};
use crate::handler::RuleMutationHandler;
use crate::persist::{
    FilePersistence, MetadataPersistence, RuleSnapshot, RuleWatcher, RulesDocument,
};
use crate::rule::{GlobalRule, GlobalRuleMetaData, RuleConfiguration, RuleKind};

/// Errors that abort node startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to load stored rules: {0}")]
    Load(#[source] PersistError),

    #[error("Failed to seed rules: {0}")]
    Seed(#[source] PersistError),

    #[error("Failed to build {kind} rule: {source}")]
    Build {
        kind: RuleKind,
        #[source]
        source: RuleError,
    },

    #[error("Failed to watch rules store: {0}")]
    Watch(#[from] notify::Error),
}

/// A started node: its configuration, rule metadata and mutation handler.
pub struct RuleNode {
    config: NodeConfig,
    handler: Arc<RuleMutationHandler>,
    store: Option<FilePersistence>,
}

/// Keeps the store watcher alive; dropping it stops refreshes.
pub struct WatchGuard {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl RuleNode {
    /// Start with the built-in registry and the store the config describes.
    pub async fn start(config: NodeConfig) -> Result<Self, StartupError> {
        let store = config
            .persistence
            .enabled
            .then(|| FilePersistence::new(&config.persistence.path));
        let persistence = store
            .clone()
            .map(|store| Arc::new(store) as Arc<dyn MetadataPersistence>);

        let handler =
            Self::bootstrap(&config, AlgorithmRegistry::with_builtin(), persistence).await?;
        Ok(Self {
            config,
            handler,
            store,
        })
    }

    /// Load or seed every rule kind and build the mutation handler. The
    /// handler writes as `config.node.id`, continuing that node's stored
    /// generation.
    pub async fn bootstrap(
        config: &NodeConfig,
        registry: AlgorithmRegistry,
        persistence: Option<Arc<dyn MetadataPersistence>>,
    ) -> Result<Arc<RuleMutationHandler>, StartupError> {
        let registry = Arc::new(registry);
        let stored = match &persistence {
            Some(persistence) => persistence.load().await.map_err(StartupError::Load)?,
            None => RulesDocument::default(),
        };
        let origin = config.node.id.clone();
        let mut generation = stored.generation_of(&origin);

        let mut seeded = false;
        let mut rules = Vec::with_capacity(RuleKind::ALL.len());
        for seed in config.rules.configurations() {
            let kind = seed.kind();
            let configuration = match stored.rules.iter().find(|each| each.kind() == kind) {
                Some(existing) => existing.clone(),
                None => {
                    seeded = true;
                    seed
                }
            };
            let rule = GlobalRule::build(configuration, &registry)
                .map_err(|source| StartupError::Build { kind, source })?;
            rules.push(rule);
        }
        let metadata = Arc::new(GlobalRuleMetaData::from_rules(rules));

        if let Some(persistence) = &persistence {
            if seeded {
                generation += 1;
                let snapshot = RuleSnapshot {
                    origin: origin.clone(),
                    generation,
                    configurations: metadata.configurations(),
                };
                persistence
                    .persist(&snapshot, false)
                    .await
                    .map_err(StartupError::Seed)?;
            }
        }

        tracing::info!(
            node_id = %config.node.id,
            mode = ?config.node.mode,
            stored = stored.rules.len(),
            rules = ?metadata.kinds(),
            "Global rules loaded"
        );
        let handler = RuleMutationHandler::new(metadata, registry, persistence)
            .with_origin(origin, generation);
        Ok(Arc::new(handler))
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn handler(&self) -> &Arc<RuleMutationHandler> {
        &self.handler
    }

    /// Current configuration of every rule kind.
    pub fn configurations(&self) -> Vec<RuleConfiguration> {
        self.handler.metadata().configurations()
    }

    /// Follow the durable store for writes by other nodes. Returns `None` in
    /// standalone mode or when watching is disabled.
    pub fn watch_store(&self) -> Result<Option<WatchGuard>, StartupError> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        if self.config.node.mode != NodeMode::Cluster || !self.config.persistence.watch {
            return Ok(None);
        }

        let (watcher, mut updates) = RuleWatcher::new(store.path());
        let watcher = watcher.run()?;
        let handler = self.handler.clone();
        let task = tokio::spawn(async move {
            while let Some(document) = updates.recv().await {
                let refreshed = handler.refresh(document).await;
                if !refreshed.is_empty() {
                    tracing::info!(rules = ?refreshed, "Global rules refreshed from store");
                }
            }
        });

        Ok(Some(WatchGuard {
            _watcher: watcher,
            task,
        }))
    }
}
