//! Per-consumer dirty-path ledgers
//!
//! Every consumer that has ever asked for its dirty paths gets its own
//! ledger. Each dispatched event updates all of them, so draining one never
//! affects another.

use crate::events::{FileEvent, FileOperation};
use std::collections::{BTreeSet, HashMap};
use std::mem;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Known paths plus one dirty set per consumer
#[derive(Debug, Default)]
pub struct ConsumerLedgers {
    /// Every path currently believed to exist under some watch
    known: BTreeSet<PathBuf>,
    /// Dirty sets keyed by consumer id
    ledgers: HashMap<String, BTreeSet<PathBuf>>,
}

impl ConsumerLedgers {
    /// Create with no known paths and no consumers
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one dispatched event into the known universe and every ledger
    ///
    /// `MonitoringFinish` is left to the caller, which knows whether another
    /// watch still covers the path.
    pub fn apply(&mut self, event: &FileEvent) {
        let path = event.path();
        match event.operation {
            operation if operation.dirties() => {
                self.known.insert(path.to_path_buf());
                for ledger in self.ledgers.values_mut() {
                    ledger.insert(path.to_path_buf());
                }
            }
            FileOperation::Deleted => {
                self.known.remove(path);
                for ledger in self.ledgers.values_mut() {
                    ledger.remove(path);
                }
            }
            _ => {}
        }
    }

    /// Add a path to the known universe without touching ledgers
    pub fn remember(&mut self, path: &Path) {
        self.known.insert(path.to_path_buf());
    }

    /// Remove a path from the known universe without touching ledgers
    pub fn forget(&mut self, path: &Path) {
        self.known.remove(path);
    }

    /// Return and clear a consumer's ledger
    ///
    /// A consumer seen for the first time receives the whole known universe
    /// and starts with an empty ledger.
    pub fn drain(&mut self, consumer: &str) -> BTreeSet<PathBuf> {
        match self.ledgers.get_mut(consumer) {
            Some(ledger) => mem::take(ledger),
            None => {
                debug!(
                    "Registering ledger for consumer '{}' with {} known paths",
                    consumer,
                    self.known.len()
                );
                self.ledgers.insert(consumer.to_string(), BTreeSet::new());
                self.known.clone()
            }
        }
    }

    /// Every path currently believed to exist
    pub fn known(&self) -> &BTreeSet<PathBuf> {
        &self.known
    }

    /// Number of registered consumers
    pub fn consumer_count(&self) -> usize {
        self.ledgers.len()
    }
}
