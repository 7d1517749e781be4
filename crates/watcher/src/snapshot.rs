//! Per-request enumerations and the diff between two of them

use crate::events::{FileEvent, FileOperation};
use crate::exclude::ExclusionFilter;
use crate::request::MonitoringRequest;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::trace;
use walkdir::WalkDir;

/// Paths covered by one request, with their last modification times
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<PathBuf, SystemTime>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerate everything a request currently covers
    ///
    /// A missing root produces an empty snapshot. Entries that disappear or
    /// cannot be read mid-walk are treated as absent.
    pub fn enumerate(request: &MonitoringRequest, filter: &ExclusionFilter) -> Self {
        let mut snapshot = Self::new();
        let root = &request.root;

        let metadata = match fs::metadata(root) {
            Ok(metadata) => metadata,
            Err(e) => {
                trace!("Watch root {:?} is not readable: {}", root, e);
                return snapshot;
            }
        };

        if !metadata.is_dir() {
            if let Ok(modified) = metadata.modified() {
                snapshot.insert(root.clone(), modified);
            }
            return snapshot;
        }

        let max_depth = if request.watch_subtree { usize::MAX } else { 1 };
        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !filter.should_exclude(entry.path(), entry.file_type().is_dir()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    trace!("Skipping unreadable entry under {:?}: {}", root, e);
                    continue;
                }
            };

            // Flat requests only track immediate files
            if !request.watch_subtree && entry.file_type().is_dir() {
                continue;
            }

            match entry
                .metadata()
                .map_err(std::io::Error::from)
                .and_then(|m| m.modified())
            {
                Ok(modified) => snapshot.insert(entry.into_path(), modified),
                Err(e) => trace!("Skipping {:?}: {}", entry.path(), e),
            }
        }

        snapshot
    }

    /// Events that turn `self` (the previous state) into `current`
    ///
    /// Creations and updates come first in path order, then deletions in
    /// path order. Deletions carry the previously recorded timestamp.
    pub fn diff(&self, current: &Snapshot) -> Vec<FileEvent> {
        let mut events = Vec::new();

        for (path, &modified) in &current.entries {
            match self.entries.get(path) {
                None => events.push(FileEvent::new(FileOperation::Created, path.clone(), modified)),
                Some(&previous) if previous != modified => {
                    events.push(FileEvent::new(FileOperation::Updated, path.clone(), modified))
                }
                Some(_) => {}
            }
        }

        for (path, &modified) in &self.entries {
            if !current.entries.contains_key(path) {
                events.push(FileEvent::new(FileOperation::Deleted, path.clone(), modified));
            }
        }

        events
    }

    /// One event of kind `operation` per recorded path
    pub fn events(&self, operation: FileOperation) -> Vec<FileEvent> {
        self.entries
            .iter()
            .map(|(path, &modified)| FileEvent::new(operation, path.clone(), modified))
            .collect()
    }

    /// Record a path
    pub fn insert(&mut self, path: PathBuf, modified: SystemTime) {
        self.entries.insert(path, modified);
    }

    /// Forget a path, returning its last timestamp
    pub fn remove(&mut self, path: &Path) -> Option<SystemTime> {
        self.entries.remove(path)
    }

    /// Timestamp recorded for a path
    pub fn get(&self, path: &Path) -> Option<SystemTime> {
        self.entries.get(path).copied()
    }

    /// Whether a path is recorded
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Iterate recorded paths in lexical order
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &SystemTime)> {
        self.entries.iter()
    }

    /// Number of recorded paths
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Current modification time of a path, if it still exists
pub fn modification_time(path: &Path) -> Option<SystemTime> {
    entry_state(path).map(|(modified, _)| modified)
}

/// Modification time and directory flag of a path, without following links
pub fn entry_state(path: &Path) -> Option<(SystemTime, bool)> {
    let metadata = fs::symlink_metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    Some((modified, metadata.is_dir()))
}
