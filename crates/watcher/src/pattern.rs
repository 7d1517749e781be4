//! Ant-style path patterns
//!
//! A pattern is an absolute path in which `*` matches within one segment and
//! a `**` segment matches any number of directories. Matching is purely
//! lexical. Searching walks from the deepest literal directory that precedes
//! the first wildcard.

use crate::exclude::ExclusionFilter;
use glob::{MatchOptions, Pattern};
use pollwatch_core::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{is_separator, Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, trace};
use walkdir::WalkDir;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A validated, compiled path pattern
#[derive(Debug, Clone)]
pub struct AntPattern {
    raw: String,
    compiled: Pattern,
    base_dir: PathBuf,
}

impl AntPattern {
    /// Parse a pattern
    ///
    /// Fails with [`Error::InvalidPattern`] when the pattern has no wildcard,
    /// has no directory separator before its first wildcard, or does not
    /// compile.
    pub fn new(pattern: &str) -> Result<Self> {
        let wildcard = pattern
            .find('*')
            .ok_or_else(|| Error::invalid_pattern(pattern, "pattern has no wildcard"))?;

        let separator = pattern[..wildcard].rfind(is_separator).ok_or_else(|| {
            Error::invalid_pattern(pattern, "no directory separator before the first wildcard")
        })?;

        let base_dir = if separator == 0 {
            PathBuf::from(&pattern[..1])
        } else {
            PathBuf::from(&pattern[..separator])
        };

        let compiled =
            Pattern::new(pattern).map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;

        Ok(Self {
            raw: pattern.to_string(),
            compiled,
            base_dir,
        })
    }

    /// The pattern text
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Directory that a search starts from
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Check a candidate path without touching the filesystem
    pub fn matches(&self, path: &Path) -> bool {
        self.compiled.matches_path_with(path, MATCH_OPTIONS)
    }

    /// Find every existing path below the base directory that matches
    ///
    /// A missing base directory yields an empty result. Excluded entries are
    /// skipped and not descended into. Entries that vanish or cannot be read
    /// during the walk are left out.
    pub fn find_matching(&self, filter: &ExclusionFilter) -> BTreeMap<PathBuf, SystemTime> {
        let mut found = BTreeMap::new();

        if !self.base_dir.is_dir() {
            debug!(
                "Pattern base {:?} is not a directory, no matches for '{}'",
                self.base_dir, self.raw
            );
            return found;
        }

        let walker = WalkDir::new(&self.base_dir)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !filter.should_exclude(entry.path(), entry.file_type().is_dir()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    trace!("Skipping unreadable entry during search: {}", e);
                    continue;
                }
            };

            if !self.matches(entry.path()) {
                continue;
            }

            match entry
                .metadata()
                .map_err(std::io::Error::from)
                .and_then(|m| m.modified())
            {
                Ok(modified) => {
                    found.insert(entry.into_path(), modified);
                }
                Err(e) => trace!("Skipping {:?}: {}", entry.path(), e),
            }
        }

        debug!("Pattern '{}' matched {} paths", self.raw, found.len());
        found
    }
}

/// Check `path` against `pattern`
pub fn matches(pattern: &str, path: &Path) -> Result<bool> {
    Ok(AntPattern::new(pattern)?.matches(path))
}

/// Find all existing paths matching `pattern`, sorted lexically
pub fn find_matching(
    pattern: &str,
    filter: &ExclusionFilter,
) -> Result<BTreeMap<PathBuf, SystemTime>> {
    Ok(AntPattern::new(pattern)?.find_matching(filter))
}
