//! # dnd_playground
//!
//! Drives one entity through construction, deferred registration, an
//! identifier change and teardown against a fresh manager, logging the
//! registry after every step.
//!
//! ```text
//! RUST_LOG=dnd_abstract=debug dnd_playground --id card-1 --rename-to card-2
//! ```

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dnd_abstract::{DuplicatePolicy, ManagerConfig};
use scenario::Scenario;

#[derive(Parser)]
#[command(name = "dnd_playground", about = "Entity lifecycle walkthrough")]
struct Args {
    /// JSON file with a manager configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reject duplicate identifiers instead of replacing the holder
    #[arg(long)]
    reject_duplicates: bool,

    /// Identifier the entity is constructed with
    #[arg(long, default_value = "x1")]
    id: String,

    /// Identifier the entity is renamed to once registered
    #[arg(long, default_value = "x2")]
    rename_to: String,

    /// Label stored in the entity's data payload
    #[arg(long, default_value = "foo")]
    label: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dnd_playground=info,dnd_abstract=debug".into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!(?config, "manager configuration");

    let report = Scenario {
        id: args.id,
        rename_to: args.rename_to,
        label: args.label,
    }
    .run(config)?;

    for step in &report.steps {
        info!(step = step.name, registered = ?step.registered, "step complete");
    }
    info!("lifecycle walkthrough finished");
    Ok(())
}

fn load_config(args: &Args) -> Result<ManagerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => ManagerConfig::default(),
    };
    if args.reject_duplicates {
        config = config.with_duplicate_policy(DuplicatePolicy::Reject);
    }
    Ok(config)
}
