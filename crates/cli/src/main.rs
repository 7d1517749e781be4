//! pollwatch CLI - polling file change detection
//!
//! This binary watches directory trees and prints every detected change.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pollwatch::{load_config, resolve_root, EventPrinter};
use pollwatch_watcher::{MonitoringRequest, PollingDriver, PollingEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "pollwatch")]
#[command(about = "Polling file change detection")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch directories and print changes until interrupted
    Watch {
        /// Roots to watch
        #[arg(required = true)]
        roots: Vec<PathBuf>,

        /// Watch only immediate children instead of whole subtrees
        #[arg(long)]
        flat: bool,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// List existing paths matching an ant-style pattern
    Find {
        /// Absolute pattern such as "/proj/**/*.rs"
        pattern: String,

        /// Print matches as JSON lines
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Watch { roots, flat, json } => {
            watch(cli.config.as_deref(), &roots, flat, json).await
        }
        Commands::Find { pattern, json } => find(cli.config.as_deref(), &pattern, json),
    }
}

/// Initialize logging system
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "pollwatch_watcher={level},pollwatch_core={level},{}={level}",
            env!("CARGO_PKG_NAME")
        ))
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

async fn watch(config_path: Option<&Path>, roots: &[PathBuf], flat: bool, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = Arc::new(PollingEngine::new(&config.watcher)?);
    engine.add_listener(Arc::new(EventPrinter::new(json)));

    for root in roots {
        let root = resolve_root(root)?;
        let request = MonitoringRequest::new(root, !flat);
        if !engine.add(request.clone()) {
            warn!("{} is already covered by another watch", request);
        }
    }

    let driver = PollingDriver::spawn(Arc::clone(&engine), &config.watcher);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Interrupted, stopping watch");

    driver.shutdown().await?;
    debug!("Final engine state: {:?}", engine.stats());
    Ok(())
}

fn find(config_path: Option<&Path>, pattern: &str, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = PollingEngine::new(&config.watcher)?;
    let found = engine.find_matching(pattern)?;
    debug!("Pattern {} matched {} paths", pattern, found.len());

    for (path, modified) in found {
        if json {
            let line = serde_json::json!({ "path": path, "modified": modified });
            println!("{line}");
        } else {
            println!("{}", path.display());
        }
    }

    Ok(())
}
