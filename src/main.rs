//! Rule governor node CLI.
//!
//! # Architecture Overview
//!
//! ```text
//!   statement (JSON, already parsed)
//!        │
//!        ▼
//!   ┌──────────────────────┐   resolve/create   ┌───────────────────┐
//!   │ RuleMutationHandler  │───────────────────▶│ AlgorithmRegistry │
//!   │ alter / create / drop│                    └───────────────────┘
//!   └──────────┬───────────┘
//!              │ atomic publish
//!              ▼
//!   ┌──────────────────────┐        reads       ┌───────────────────┐
//!   │  GlobalRuleMetaData  │◀───────────────────│ routing / engine  │
//!   └──────────┬───────────┘                    └───────────────────┘
//!              │ persist (outside locks)
//!              ▼
//!   ┌──────────────────────┐   watch / refresh  ┌───────────────────┐
//!   │ MetadataPersistence  │───────────────────▶│    peer nodes     │
//!   └──────────────────────┘                    └───────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use rule_governor::algorithm::AlgorithmKind;
use rule_governor::config::{load_config, NodeConfig};
use rule_governor::observability::{logging, metrics};
use rule_governor::{RuleNode, RuleStatement};

#[derive(Parser)]
#[command(name = "rule-governor")]
#[command(about = "Global rule administration for proxy nodes", long_about = None)]
struct Cli {
    /// Node configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the active global rule configurations
    Show,
    /// Execute one rule statement read from a JSON file
    Apply {
        statement: PathBuf,
    },
    /// List registered algorithm types per capability
    Algorithms,
    /// Follow the shared rules store until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => NodeConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(
        node_id = %config.node.id,
        "rule-governor v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let node = RuleNode::start(config).await?;

    match cli.command {
        Commands::Show => {
            println!("{}", serde_json::to_string_pretty(&node.configurations())?);
        }
        Commands::Apply { statement } => {
            let content = std::fs::read_to_string(&statement)?;
            let statement: RuleStatement = serde_json::from_str(&content)?;
            match node.handler().execute(&statement).await {
                Ok(report) => {
                    let output = serde_json::json!({
                        "rule_kind": report.rule_kind,
                        "configuration": report.configuration,
                        "warning": report.warning.as_ref().map(|w| w.to_string()),
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                Err(e) => {
                    eprintln!("Error [{:?}]: {}", e.kind(), e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Algorithms => {
            let registry = node.handler().registry();
            for kind in AlgorithmKind::ALL {
                println!("{}: {}", kind, registry.types(kind).join(", "));
            }
        }
        Commands::Watch => {
            let guard = node.watch_store()?;
            if guard.is_none() {
                tracing::warn!(
                    "Store watching needs cluster mode with persistence and watch enabled"
                );
                return Ok(());
            }
            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutdown complete");
        }
    }

    Ok(())
}
