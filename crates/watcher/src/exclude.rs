//! Exclusion rules applied while enumerating watched trees
//!
//! Hidden entries, the engine's own log file and heuristic build-output
//! directories are never enumerated, and nothing below an excluded
//! directory is visited.

use glob::Pattern;
use pollwatch_core::config::WatcherConfig;
use pollwatch_core::error::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

/// Directory names treated as build output outside a source tree
const BUILD_OUTPUT_DIRS: [&str; 2] = ["target", "bin"];

/// Segment marking the start of a source tree
const SOURCE_DIR: &str = "src";

/// Decides which paths a scan skips
#[derive(Clone, Debug)]
pub struct ExclusionFilter {
    /// Extra glob patterns matched against the whole path
    patterns: Arc<Vec<Pattern>>,
    /// Log file name that is always skipped
    log_file_name: Option<String>,
    exclude_hidden: bool,
    exclude_build_output: bool,
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self::from_config(&WatcherConfig::default()).unwrap_or_else(|_| Self::none())
    }
}

impl ExclusionFilter {
    /// A filter that excludes nothing
    pub fn none() -> Self {
        Self {
            patterns: Arc::new(Vec::new()),
            log_file_name: None,
            exclude_hidden: false,
            exclude_build_output: false,
        }
    }

    /// Build the filter described by a watcher configuration
    pub fn from_config(config: &WatcherConfig) -> Result<Self> {
        Self::builder()
            .patterns(config.ignore_patterns.clone())
            .log_file_name(config.log_file_name.clone())
            .exclude_hidden(config.exclude_hidden)
            .exclude_build_output(config.exclude_build_output)
            .build()
    }

    /// Create with builder pattern
    pub fn builder() -> ExclusionFilterBuilder {
        ExclusionFilterBuilder::default()
    }

    /// Check whether a single entry is excluded
    ///
    /// Only the entry's own name is tested against the name rules; the
    /// caller is responsible for not descending into excluded directories.
    pub fn should_exclude(&self, path: &Path, is_dir: bool) -> bool {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => return false,
        };

        if self.exclude_hidden && is_hidden_name(&name) {
            trace!("Excluding hidden entry: {:?}", path);
            return true;
        }

        if self.log_file_name.as_deref() == Some(name.as_ref()) {
            trace!("Excluding log file: {:?}", path);
            return true;
        }

        if is_dir && self.exclude_build_output && is_build_output(path, &name) {
            trace!("Excluding build output directory: {:?}", path);
            return true;
        }

        let path_str = path.to_string_lossy();
        if self.patterns.iter().any(|p| p.matches(&path_str)) {
            trace!("Excluding path matching ignore pattern: {:?}", path);
            return true;
        }

        false
    }

    /// Check whether `path`, or any directory between `root` and it, is excluded
    ///
    /// Used for paths that were reported rather than enumerated. The root
    /// itself is never tested.
    pub fn is_excluded_below(&self, root: &Path, path: &Path) -> bool {
        if !path.starts_with(root) {
            return false;
        }

        path.ancestors()
            .take_while(|ancestor| *ancestor != root)
            .any(|ancestor| {
                let is_dir = ancestor != path || path.is_dir();
                self.should_exclude(ancestor, is_dir)
            })
    }
}

/// Builder for ExclusionFilter
pub struct ExclusionFilterBuilder {
    patterns: Vec<String>,
    log_file_name: Option<String>,
    exclude_hidden: bool,
    exclude_build_output: bool,
}

impl Default for ExclusionFilterBuilder {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            log_file_name: None,
            exclude_hidden: true,
            exclude_build_output: true,
        }
    }
}

impl ExclusionFilterBuilder {
    /// Add a glob pattern to exclude
    pub fn add_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Add multiple patterns
    pub fn patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns.extend(patterns);
        self
    }

    /// Set the log file name to skip
    pub fn log_file_name(mut self, name: impl Into<String>) -> Self {
        self.log_file_name = Some(name.into());
        self
    }

    /// Set whether dot entries are skipped
    pub fn exclude_hidden(mut self, exclude: bool) -> Self {
        self.exclude_hidden = exclude;
        self
    }

    /// Set whether build output directories are skipped
    pub fn exclude_build_output(mut self, exclude: bool) -> Self {
        self.exclude_build_output = exclude;
        self
    }

    /// Build the exclusion filter
    pub fn build(self) -> Result<ExclusionFilter> {
        let compiled_patterns = self
            .patterns
            .iter()
            .map(|p| Pattern::new(p).map_err(|e| Error::invalid_pattern(p.as_str(), e.to_string())))
            .collect::<Result<Vec<_>>>()?;

        Ok(ExclusionFilter {
            patterns: Arc::new(compiled_patterns),
            log_file_name: self.log_file_name,
            exclude_hidden: self.exclude_hidden,
            exclude_build_output: self.exclude_build_output,
        })
    }
}

/// Dot-prefixed names other than `.` itself
fn is_hidden_name(name: &str) -> bool {
    name.len() > 1 && name.starts_with('.')
}

fn is_build_output(path: &Path, name: &str) -> bool {
    let in_source_tree = path
        .parent()
        .map(|parent| {
            parent
                .components()
                .any(|c| c.as_os_str() == SOURCE_DIR)
        })
        .unwrap_or(false);

    if in_source_tree {
        name.to_lowercase().contains("maven")
    } else {
        BUILD_OUTPUT_DIRS.contains(&name)
    }
}
