//! Registry of active monitoring requests
//!
//! Recursive requests are kept minimal: a recursive root that lies inside
//! another recursive root is redundant and is either refused or evicted.

use crate::request::MonitoringRequest;
use std::path::Path;
use tracing::{debug, info};

/// Result of [`WatchRegistry::add`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOutcome {
    /// Whether the new request was registered
    pub registered: bool,
    /// Existing requests removed because the new one subsumes them
    pub evicted: Vec<MonitoringRequest>,
}

/// Ordered set of active requests
#[derive(Debug, Default)]
pub struct WatchRegistry {
    requests: Vec<MonitoringRequest>,
}

impl WatchRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request, applying subsumption between recursive requests
    pub fn add(&mut self, request: MonitoringRequest) -> AddOutcome {
        if self.requests.contains(&request) {
            debug!("Request {} is already registered", request);
            return AddOutcome::default();
        }

        let mut evicted = Vec::new();
        if request.watch_subtree {
            if let Some(existing) = self
                .requests
                .iter()
                .find(|existing| existing.watch_subtree && request.is_within(existing))
            {
                debug!("Request {} is subsumed by {}", request, existing);
                return AddOutcome::default();
            }

            self.requests.retain(|existing| {
                let subsumed = existing.watch_subtree && existing.is_within(&request);
                if subsumed {
                    info!("Request {} subsumes {}", request, existing);
                    evicted.push(existing.clone());
                }
                !subsumed
            });
        }

        info!("Registered monitoring request {}", request);
        self.requests.push(request);

        AddOutcome {
            registered: true,
            evicted,
        }
    }

    /// Unregister a request
    pub fn remove(&mut self, request: &MonitoringRequest) -> bool {
        let before = self.requests.len();
        self.requests.retain(|existing| existing != request);
        let removed = self.requests.len() != before;
        if removed {
            info!("Removed monitoring request {}", request);
        }
        removed
    }

    /// Snapshot of the registered requests in registration order
    pub fn list(&self) -> Vec<MonitoringRequest> {
        self.requests.clone()
    }

    /// Requests whose coverage includes `path`
    pub fn covering<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = &'a MonitoringRequest> {
        self.requests.iter().filter(move |request| request.covers(path))
    }

    /// Number of registered requests
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether no request is registered
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
