//! Monitoring requests and their coverage rules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One watch root registered with the engine
///
/// `watch_subtree` only matters for directory roots. A root that is a file
/// at scan time is enumerated as that single file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitoringRequest {
    /// Root path (file or directory)
    pub root: PathBuf,
    /// Whether descendants below the immediate children are watched
    pub watch_subtree: bool,
}

impl MonitoringRequest {
    /// Create a new request
    pub fn new(root: impl Into<PathBuf>, watch_subtree: bool) -> Self {
        Self {
            root: root.into(),
            watch_subtree,
        }
    }

    /// Watch a directory and everything below it
    pub fn recursive(root: impl Into<PathBuf>) -> Self {
        Self::new(root, true)
    }

    /// Watch a directory's immediate children, or a single file
    pub fn flat(root: impl Into<PathBuf>) -> Self {
        Self::new(root, false)
    }

    /// Check whether a change to `path` belongs to this request
    ///
    /// Recursive requests cover every path below the root. Flat requests
    /// cover exactly one level down. Either kind covers the root itself,
    /// which is how single-file requests match.
    pub fn covers(&self, path: &Path) -> bool {
        if path == self.root {
            return true;
        }
        if self.watch_subtree {
            path.starts_with(&self.root)
        } else {
            path.parent() == Some(self.root.as_path())
        }
    }

    /// Whether a scan of this request would list an existing entry
    ///
    /// Stricter than [`covers`](Self::covers): a directory root is never
    /// listed, and flat requests only list the root's immediate files.
    pub fn lists(&self, path: &Path, is_dir: bool) -> bool {
        if path == self.root {
            return !is_dir;
        }
        if self.watch_subtree {
            path.starts_with(&self.root)
        } else {
            !is_dir && path.parent() == Some(self.root.as_path())
        }
    }

    /// Whether this request's root lies within `other`'s root (inclusive)
    pub fn is_within(&self, other: &MonitoringRequest) -> bool {
        self.root.starts_with(&other.root)
    }
}

impl fmt::Display for MonitoringRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.watch_subtree {
            "recursive"
        } else {
            "flat"
        };
        write!(f, "{} ({mode})", self.root.display())
    }
}
