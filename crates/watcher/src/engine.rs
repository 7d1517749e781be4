//! The polling change-detection engine
//!
//! [`PollingEngine`] owns the registry, one snapshot per request, the pending
//! notification sets, the consumer ledgers and the listener list. Every
//! public operation takes one reentrant lock for its whole duration, so
//! concurrent callers serialize.
//!
//! Listeners are invoked while the lock is held but after the interior
//! state borrow has been released, which lets a listener call back into the
//! engine from the scanning thread.

use crate::events::{FileEvent, FileEventListener, FileOperation};
use crate::exclude::ExclusionFilter;
use crate::ledger::ConsumerLedgers;
use crate::pattern::AntPattern;
use crate::pending::PendingNotifications;
use crate::registry::WatchRegistry;
use crate::request::MonitoringRequest;
use crate::snapshot::{entry_state, modification_time, Snapshot};
use parking_lot::ReentrantMutex;
use pollwatch_core::config::WatcherConfig;
use pollwatch_core::error::Result;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, trace};

/// Handle returned by [`PollingEngine::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Point-in-time counters for introspection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Registered requests
    pub requests: usize,
    /// Requests that have completed at least one full scan
    pub scanned_requests: usize,
    /// Distinct paths across all snapshots
    pub monitored_paths: usize,
    /// Entries across the pending notification sets
    pub pending_notifications: usize,
    /// Paths in the known universe handed to new consumers
    pub known_paths: usize,
    /// Consumers with a ledger
    pub consumers: usize,
    /// Registered listeners
    pub listeners: usize,
}

#[derive(Debug, Clone, Copy)]
enum Notification {
    Created,
    Changed,
    Deleted,
}

/// Polling file change detector
pub struct PollingEngine {
    inner: ReentrantMutex<RefCell<EngineState>>,
}

impl Default for PollingEngine {
    fn default() -> Self {
        Self::with_filter(ExclusionFilter::default())
    }
}

impl PollingEngine {
    /// Create an engine using the exclusion rules from `config`
    pub fn new(config: &WatcherConfig) -> Result<Self> {
        Ok(Self::with_filter(ExclusionFilter::from_config(config)?))
    }

    /// Create an engine with an explicit exclusion filter
    pub fn with_filter(filter: ExclusionFilter) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(EngineState::new(filter))),
        }
    }

    /// Register a monitoring request
    ///
    /// Returns `false` when the request is already registered or lies inside
    /// an existing recursive request. Recursive requests inside the new one
    /// are removed first and emit `MonitoringFinish` for their paths.
    pub fn add(&self, request: MonitoringRequest) -> bool {
        let guard = self.inner.lock();
        let (registered, events) = {
            let mut state = guard.borrow_mut();
            let outcome = state.registry.add(request);
            let mut events = Vec::new();
            for evicted in &outcome.evicted {
                events.extend(state.retire(evicted));
            }
            (outcome.registered, events)
        };
        Self::publish(&guard, events);
        registered
    }

    /// Unregister a request, emitting `MonitoringFinish` for its paths
    pub fn remove(&self, request: &MonitoringRequest) -> bool {
        let guard = self.inner.lock();
        let events = {
            let mut state = guard.borrow_mut();
            if !state.registry.remove(request) {
                return false;
            }
            state.retire(request)
        };
        Self::publish(&guard, events);
        true
    }

    /// Registered requests in registration order
    pub fn list(&self) -> Vec<MonitoringRequest> {
        self.inner.lock().borrow().registry.list()
    }

    /// Re-enumerate every request, diff against its snapshot and publish
    ///
    /// Returns the number of events published.
    pub fn scan_all(&self) -> usize {
        let guard = self.inner.lock();
        let started = Instant::now();
        let events = guard.borrow_mut().scan_all();
        let count = Self::publish(&guard, events);
        debug!(
            "Full scan published {} events in {:?}",
            count,
            started.elapsed()
        );
        count
    }

    /// Resolve only the pending notifications and publish
    ///
    /// Returns 0 without touching the filesystem when nothing is registered
    /// or nothing is pending.
    pub fn scan_notified(&self) -> usize {
        let guard = self.inner.lock();
        let events = guard.borrow_mut().scan_notified();
        let count = Self::publish(&guard, events);
        if count > 0 {
            debug!("Notified scan published {} events", count);
        }
        count
    }

    /// Report that `path` was created
    pub fn notify_created(&self, path: impl AsRef<Path>) {
        self.notify(path.as_ref(), Notification::Created);
    }

    /// Report that `path` was modified
    pub fn notify_changed(&self, path: impl AsRef<Path>) {
        self.notify(path.as_ref(), Notification::Changed);
    }

    /// Report that `path` was deleted
    pub fn notify_deleted(&self, path: impl AsRef<Path>) {
        self.notify(path.as_ref(), Notification::Deleted);
    }

    /// Whether any notification is waiting for [`scan_notified`](Self::scan_notified)
    pub fn is_dirty(&self) -> bool {
        !self.inner.lock().borrow().pending.is_empty()
    }

    /// Whether a notification for `path` would be tracked
    pub fn is_covered(&self, path: impl AsRef<Path>) -> bool {
        self.inner.lock().borrow().is_tracked(path.as_ref())
    }

    /// Register a listener for every published event
    pub fn add_listener(&self, listener: Arc<dyn FileEventListener>) -> ListenerId {
        let guard = self.inner.lock();
        let mut state = guard.borrow_mut();
        let id = ListenerId(state.next_listener_id);
        state.next_listener_id += 1;
        state.listeners.push((id, listener));
        debug!("Registered listener {:?}", id);
        id
    }

    /// Register a closure as a listener
    pub fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&FileEvent) + Send + Sync + 'static,
    {
        self.add_listener(Arc::new(callback))
    }

    /// Unregister a listener
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let guard = self.inner.lock();
        let mut state = guard.borrow_mut();
        let before = state.listeners.len();
        state.listeners.retain(|(existing, _)| *existing != id);
        state.listeners.len() != before
    }

    /// Drain the paths dirtied since `consumer` last asked
    ///
    /// The first call for a consumer returns every known path.
    pub fn get_dirty_paths(&self, consumer: &str) -> BTreeSet<PathBuf> {
        self.inner.lock().borrow_mut().ledgers.drain(consumer)
    }

    /// Every path in every stored snapshot
    pub fn get_monitored_paths(&self) -> BTreeMap<PathBuf, SystemTime> {
        let guard = self.inner.lock();
        let state = guard.borrow();
        let mut monitored = BTreeMap::new();
        for snapshot in state.snapshots.values() {
            for (path, modified) in snapshot.iter() {
                monitored.insert(path.clone(), *modified);
            }
        }
        monitored
    }

    /// Check `path` against an ant-style pattern
    pub fn matches(&self, pattern: &str, path: impl AsRef<Path>) -> Result<bool> {
        Ok(AntPattern::new(pattern)?.matches(path.as_ref()))
    }

    /// Find existing, non-excluded paths matching an ant-style pattern
    pub fn find_matching(&self, pattern: &str) -> Result<BTreeMap<PathBuf, SystemTime>> {
        let pattern = AntPattern::new(pattern)?;
        let guard = self.inner.lock();
        let filter = guard.borrow().filter.clone();
        Ok(pattern.find_matching(&filter))
    }

    /// Current counters
    pub fn stats(&self) -> EngineStats {
        let guard = self.inner.lock();
        let state = guard.borrow();
        let monitored: HashSet<&PathBuf> = state
            .snapshots
            .values()
            .flat_map(|snapshot| snapshot.iter().map(|(path, _)| path))
            .collect();

        EngineStats {
            requests: state.registry.len(),
            scanned_requests: state.snapshots.len(),
            monitored_paths: monitored.len(),
            pending_notifications: state.pending.len(),
            known_paths: state.ledgers.known().len(),
            consumers: state.ledgers.consumer_count(),
            listeners: state.listeners.len(),
        }
    }

    fn notify(&self, path: &Path, kind: Notification) {
        let guard = self.inner.lock();
        let mut state = guard.borrow_mut();
        state.notify(path, kind);
    }

    /// Hand events to the ledgers and listeners one at a time, in order
    fn publish(cell: &RefCell<EngineState>, events: Vec<FileEvent>) -> usize {
        for event in &events {
            let listeners: Vec<Arc<dyn FileEventListener>> = {
                let mut state = cell.borrow_mut();
                state.record(event);
                state
                    .listeners
                    .iter()
                    .map(|(_, listener)| Arc::clone(listener))
                    .collect()
            };
            for listener in listeners {
                listener.on_file_event(event);
            }
        }
        events.len()
    }
}

struct EngineState {
    filter: ExclusionFilter,
    registry: WatchRegistry,
    snapshots: HashMap<MonitoringRequest, Snapshot>,
    pending: PendingNotifications,
    ledgers: ConsumerLedgers,
    listeners: Vec<(ListenerId, Arc<dyn FileEventListener>)>,
    next_listener_id: u64,
}

impl EngineState {
    fn new(filter: ExclusionFilter) -> Self {
        Self {
            filter,
            registry: WatchRegistry::new(),
            snapshots: HashMap::new(),
            pending: PendingNotifications::new(),
            ledgers: ConsumerLedgers::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    /// Drop a request's snapshot and produce its terminal events
    fn retire(&mut self, request: &MonitoringRequest) -> Vec<FileEvent> {
        self.snapshots
            .remove(request)
            .map(|snapshot| snapshot.events(FileOperation::MonitoringFinish))
            .unwrap_or_default()
    }

    fn scan_all(&mut self) -> Vec<FileEvent> {
        let mut events = Vec::new();
        let mut emitted = HashSet::new();

        for request in self.registry.list() {
            let current = Snapshot::enumerate(&request, &self.filter);

            let request_events = match self.snapshots.get(&request) {
                None => {
                    trace!(
                        "First scan of {} found {} paths",
                        request,
                        current.len()
                    );
                    current.events(FileOperation::MonitoringStart)
                }
                Some(previous) => previous.diff(&current),
            };

            for event in request_events {
                let resolved = match event.operation {
                    FileOperation::Deleted => self.pending.resolve_deleted(&event.path),
                    _ => self.pending.resolve_present(&event.path),
                };
                if resolved {
                    trace!("Scan resolved pending notification for {:?}", event.path);
                }

                // Overlapping requests report a path once per pass
                if emitted.insert((event.path.clone(), event.operation)) {
                    events.push(event);
                }
            }

            self.snapshots.insert(request, current);
        }

        events
    }

    fn scan_notified(&mut self) -> Vec<FileEvent> {
        if self.registry.is_empty() || self.pending.is_empty() {
            return Vec::new();
        }

        let pending = self.pending.take();
        let mut events = Vec::new();

        for path in pending.created {
            events.extend(self.confirm_present(path, FileOperation::Created));
        }
        for path in pending.changed {
            events.extend(self.confirm_present(path, FileOperation::Updated));
        }
        for path in pending.deleted {
            events.extend(self.confirm_deleted(path));
        }

        events
    }

    /// Requests that cover `path` without excluding it
    fn tracking_requests(&self, path: &Path) -> Vec<MonitoringRequest> {
        self.registry
            .covering(path)
            .filter(|request| !self.filter.is_excluded_below(&request.root, path))
            .cloned()
            .collect()
    }

    fn is_tracked(&self, path: &Path) -> bool {
        !self.tracking_requests(path).is_empty()
    }

    fn confirm_present(&mut self, path: PathBuf, operation: FileOperation) -> Option<FileEvent> {
        let requests = self.tracking_requests(&path);
        if requests.is_empty() {
            trace!("Dropping notification for uncovered path {:?}", path);
            return None;
        }

        let (modified, is_dir) = match entry_state(&path) {
            Some(state) => state,
            None => {
                trace!("Dropping stale notification, {:?} no longer exists", path);
                return None;
            }
        };

        // Only requests whose scans would list the entry may record it
        let listing: Vec<&MonitoringRequest> = requests
            .iter()
            .filter(|request| request.lists(&path, is_dir))
            .collect();
        if listing.is_empty() {
            trace!("Dropping notification for {:?}, no scan lists it", path);
            return None;
        }

        let mut operation = operation;
        if operation == FileOperation::Created {
            let recorded = listing
                .iter()
                .filter_map(|request| self.snapshots.get(*request))
                .find_map(|snapshot| snapshot.get(&path));
            match recorded {
                Some(previous) if previous == modified => {
                    trace!("Creation of {:?} was already reported by a scan", path);
                    return None;
                }
                Some(_) => operation = FileOperation::Updated,
                None => {}
            }
        }

        for request in listing {
            if let Some(snapshot) = self.snapshots.get_mut(request) {
                snapshot.insert(path.clone(), modified);
            }
        }

        Some(FileEvent::new(operation, path, modified))
    }

    fn confirm_deleted(&mut self, path: PathBuf) -> Option<FileEvent> {
        let requests = self.tracking_requests(&path);
        if requests.is_empty() {
            trace!("Dropping notification for uncovered path {:?}", path);
            return None;
        }

        if modification_time(&path).is_some() {
            trace!("Dropping stale deletion, {:?} exists again", path);
            return None;
        }

        let mut last_seen = None;
        for request in &requests {
            if let Some(snapshot) = self.snapshots.get_mut(request) {
                if let Some(modified) = snapshot.remove(&path) {
                    last_seen.get_or_insert(modified);
                }
            }
        }

        match last_seen {
            Some(modified) => Some(FileEvent::new(FileOperation::Deleted, path, modified)),
            None => {
                trace!("Dropping deletion of never-observed path {:?}", path);
                None
            }
        }
    }

    fn notify(&mut self, path: &Path, kind: Notification) {
        match kind {
            Notification::Created | Notification::Changed => self.ledgers.remember(path),
            Notification::Deleted => self.ledgers.forget(path),
        }

        if !self.is_tracked(path) {
            trace!("Notification for {:?} is outside every watch", path);
            return;
        }

        let set = match kind {
            Notification::Created => &mut self.pending.created,
            Notification::Changed => &mut self.pending.changed,
            Notification::Deleted => &mut self.pending.deleted,
        };
        set.insert(path.to_path_buf());
    }

    /// Fold a published event into the known universe and ledgers
    fn record(&mut self, event: &FileEvent) {
        self.ledgers.apply(event);

        if event.operation == FileOperation::MonitoringFinish
            && !self
                .snapshots
                .values()
                .any(|snapshot| snapshot.contains(event.path()))
        {
            self.ledgers.forget(event.path());
        }
    }
}
