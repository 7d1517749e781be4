//! Background scheduling of engine scans
//!
//! The driver runs two timers against a shared [`PollingEngine`]: a short
//! one that resolves pending notifications when the engine is dirty, and a
//! long one that performs a full scan. Scans are blocking filesystem work
//! and run on the blocking pool.

use crate::engine::PollingEngine;
use pollwatch_core::config::WatcherConfig;
use pollwatch_core::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy)]
enum ScanKind {
    Notified,
    Full,
}

/// Handle to the running scan loop
pub struct PollingDriver {
    cancellation_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PollingDriver {
    /// Start the scan loop on the current tokio runtime
    ///
    /// The first full scan runs immediately.
    pub fn spawn(engine: Arc<PollingEngine>, config: &WatcherConfig) -> Self {
        let cancellation_token = CancellationToken::new();
        let handle = tokio::spawn(run(
            engine,
            config.scan_interval(),
            config.notify_interval(),
            cancellation_token.clone(),
        ));

        info!(
            "Polling driver started (scan every {:?}, notifications every {:?})",
            config.scan_interval(),
            config.notify_interval()
        );

        Self {
            cancellation_token,
            handle: Some(handle),
        }
    }

    /// Whether the scan loop is still running
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the loop and wait for an in-flight scan to finish
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancellation_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .map_err(|e| Error::watcher(format!("Scan loop failed: {e}")))?;
        }
        info!("Polling driver stopped");
        Ok(())
    }
}

impl Drop for PollingDriver {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

async fn run(
    engine: Arc<PollingEngine>,
    scan_interval: Duration,
    notify_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut full_tick = tokio::time::interval(scan_interval);
    full_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut notify_tick = tokio::time::interval(notify_interval);
    notify_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                debug!("Scan loop shutting down");
                break;
            }
            _ = full_tick.tick() => {
                scan(&engine, ScanKind::Full).await;
            }
            _ = notify_tick.tick() => {
                if engine.is_dirty() {
                    scan(&engine, ScanKind::Notified).await;
                }
            }
        }
    }
}

async fn scan(engine: &Arc<PollingEngine>, kind: ScanKind) {
    let engine = Arc::clone(engine);
    let result = tokio::task::spawn_blocking(move || match kind {
        ScanKind::Full => engine.scan_all(),
        ScanKind::Notified => engine.scan_notified(),
    })
    .await;

    match result {
        Ok(count) if count > 0 => debug!("{:?} scan published {} events", kind, count),
        Ok(_) => {}
        Err(e) => error!("{:?} scan panicked: {}", kind, e),
    }
}
