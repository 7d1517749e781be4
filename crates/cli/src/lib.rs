//! Library interface for the pollwatch CLI
//!
//! This module exposes the pieces of the binary that are worth testing
//! while keeping argument handling in main.rs.

use anyhow::{Context, Result};
use pollwatch_core::config::Config;
use pollwatch_watcher::{FileEvent, FileEventListener};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "pollwatch.toml";

/// Load and validate configuration
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let config = Config::from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Make a watch root absolute so it lines up with notified paths
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = root.canonicalize() {
        return Ok(canonical);
    }
    if root.is_absolute() {
        return Ok(root.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(cwd.join(root))
}

/// Render one event as a single output line
pub fn format_event(event: &FileEvent, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string(event).context("Failed to serialize event");
    }

    let millis = event
        .modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    Ok(format!(
        "{:<17} {:>13} {}",
        event.operation.as_str(),
        millis,
        event.path.display()
    ))
}

/// Listener that writes every event to stdout
pub struct EventPrinter {
    json: bool,
}

impl EventPrinter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl FileEventListener for EventPrinter {
    fn on_file_event(&self, event: &FileEvent) {
        match format_event(event, self.json) {
            Ok(line) => {
                let mut stdout = std::io::stdout().lock();
                if let Err(e) = writeln!(stdout, "{line}") {
                    tracing::warn!("Failed to write event: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to format event for {:?}: {}", event.path, e),
        }
    }
}
