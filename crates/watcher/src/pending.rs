//! Paths reported dirty by callers ahead of the next full scan

use std::collections::BTreeSet;
use std::mem;
use std::path::{Path, PathBuf};

/// The three pending notification sets
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingNotifications {
    /// Paths reported created
    pub created: BTreeSet<PathBuf>,
    /// Paths reported modified
    pub changed: BTreeSet<PathBuf>,
    /// Paths reported deleted
    pub deleted: BTreeSet<PathBuf>,
}

impl PendingNotifications {
    /// Create empty sets
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.changed.is_empty() && self.deleted.is_empty()
    }

    /// Total number of pending entries
    pub fn len(&self) -> usize {
        self.created.len() + self.changed.len() + self.deleted.len()
    }

    /// A scan saw `path` present; drop matching created/changed reports
    pub fn resolve_present(&mut self, path: &Path) -> bool {
        let created = self.created.remove(path);
        let changed = self.changed.remove(path);
        created || changed
    }

    /// A scan saw `path` disappear; drop a matching deletion report
    pub fn resolve_deleted(&mut self, path: &Path) -> bool {
        self.deleted.remove(path)
    }

    /// Take every pending entry, leaving the sets empty
    ///
    /// A path reported both created and changed is returned only in the
    /// changed set.
    pub fn take(&mut self) -> PendingNotifications {
        let mut taken = mem::take(self);
        let changed = &taken.changed;
        taken.created.retain(|path| !changed.contains(path));
        taken
    }
}
