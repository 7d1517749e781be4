#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Polling file change detection
//!
//! This crate watches directory trees by periodically enumerating them and
//! diffing the result against the previous enumeration:
//! - Flat and recursive monitoring requests with subsumption
//! - Fast resolution of caller-reported changes between full scans
//! - Per-consumer dirty-path ledgers
//! - Ant-style path matching and search
//!
//! # Example
//!
//! ```no_run
//! use pollwatch_watcher::{MonitoringRequest, PollingDriver, PollingEngine};
//! use pollwatch_core::WatcherConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> pollwatch_core::Result<()> {
//! let config = WatcherConfig::default();
//! let engine = Arc::new(PollingEngine::new(&config)?);
//! engine.subscribe(|event| println!("{:?} {}", event.operation, event.path.display()));
//! engine.add(MonitoringRequest::recursive("/path/to/project"));
//!
//! let driver = PollingDriver::spawn(Arc::clone(&engine), &config);
//! // ...
//! driver.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod driver;
mod engine;
mod events;
mod exclude;
mod ledger;
mod pattern;
mod pending;
mod registry;
mod request;
mod snapshot;

pub use driver::PollingDriver;
pub use engine::{EngineStats, ListenerId, PollingEngine};
pub use events::{FileEvent, FileEventListener, FileOperation};
pub use exclude::{ExclusionFilter, ExclusionFilterBuilder};
pub use pattern::{find_matching, matches, AntPattern};
pub use request::MonitoringRequest;
pub use snapshot::Snapshot;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::driver::PollingDriver;
    pub use crate::engine::PollingEngine;
    pub use crate::events::{FileEvent, FileEventListener, FileOperation};
    pub use crate::request::MonitoringRequest;
}
