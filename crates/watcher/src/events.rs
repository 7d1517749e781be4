//! File change event types and listener capability
//!
//! This module defines the immutable events produced by scans and the
//! single-callback trait through which consumers receive them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Kind of change carried by a [`FileEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOperation {
    /// Path appeared since the previous snapshot
    Created,
    /// Path is still present but its modification time changed
    Updated,
    /// Path disappeared since the previous snapshot
    Deleted,
    /// Path observed for the first time under a newly added request
    MonitoringStart,
    /// Path is no longer monitored because its request was removed
    MonitoringFinish,
}

impl FileOperation {
    /// Whether this operation marks the path dirty in consumer ledgers
    pub fn dirties(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Updated | Self::MonitoringStart
        )
    }

    /// Stable lowercase name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::MonitoringStart => "monitoring_start",
            Self::MonitoringFinish => "monitoring_finish",
        }
    }
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single detected change
///
/// For [`FileOperation::Deleted`] and [`FileOperation::MonitoringFinish`] the
/// timestamp is the last modification time that was seen, not the time the
/// change was detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    /// Affected path
    pub path: PathBuf,
    /// Last known modification time
    pub modified: SystemTime,
    /// What happened to the path
    pub operation: FileOperation,
}

impl FileEvent {
    /// Create a new file event
    pub fn new(operation: FileOperation, path: impl Into<PathBuf>, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            modified,
            operation,
        }
    }

    /// Get the path associated with this event
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Receives every published [`FileEvent`]
///
/// Listeners run synchronously on the scanning thread while the engine lock
/// is held. The engine releases its interior state before calling out, so a
/// listener may call back into the engine from the same thread. Calling the
/// engine from another thread and waiting on it inside the callback will
/// deadlock.
pub trait FileEventListener: Send + Sync {
    /// Handle one event
    fn on_file_event(&self, event: &FileEvent);
}

impl<F> FileEventListener for F
where
    F: Fn(&FileEvent) + Send + Sync,
{
    fn on_file_event(&self, event: &FileEvent) {
        self(event)
    }
}
