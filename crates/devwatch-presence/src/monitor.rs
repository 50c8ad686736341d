//! Polling driver for presence reconciliation
//!
//! The monitor owns the reconciler behind an async mutex so synchronizations
//! are serialized, reads the catalog fresh before every tick and feeds the
//! reconciler complete snapshots taken from a [`DeviceObserver`].

use crate::reconciler::PresenceReconciler;
use devwatch_types::{CatalogProvider, DeviceObserver, Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Drives a [`PresenceReconciler`] from a device observer
pub struct PresenceMonitor<O: DeviceObserver> {
    reconciler: Arc<Mutex<PresenceReconciler<O::Device>>>,
    observer: Arc<O>,
    catalog: Arc<dyn CatalogProvider>,
    snapshot_timeout: Option<Duration>,
}

impl<O> PresenceMonitor<O>
where
    O: DeviceObserver + 'static,
    O::Device: Clone + 'static,
{
    /// Create a monitor with a fresh reconciler
    pub fn new<C>(observer: O, catalog: C) -> Self
    where
        C: CatalogProvider + 'static,
    {
        Self::with_reconciler(observer, catalog, PresenceReconciler::new())
    }

    /// Create a monitor around an existing reconciler
    ///
    /// Use this to register subscribers before monitoring starts.
    pub fn with_reconciler<C>(
        observer: O,
        catalog: C,
        reconciler: PresenceReconciler<O::Device>,
    ) -> Self
    where
        C: CatalogProvider + 'static,
    {
        Self {
            reconciler: Arc::new(Mutex::new(reconciler)),
            observer: Arc::new(observer),
            catalog: Arc::new(catalog),
            snapshot_timeout: None,
        }
    }

    /// Give up on a snapshot that takes longer than `timeout`
    pub fn snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.snapshot_timeout = Some(timeout);
        self
    }

    /// Shared handle to the reconciler, e.g. to read connected devices
    pub fn reconciler(&self) -> Arc<Mutex<PresenceReconciler<O::Device>>> {
        Arc::clone(&self.reconciler)
    }

    /// Run one synchronization
    ///
    /// The catalog is read before the snapshot is taken; observer, timeout and
    /// reconciliation errors are returned unchanged.
    pub async fn tick(&self) -> Result<()> {
        let catalog = self.catalog.current_catalog();
        let devices = self.take_snapshot().await?;

        let mut reconciler = self.reconciler.lock().await;
        match catalog {
            Some(catalog) => {
                let unchanged = reconciler
                    .catalog()
                    .is_some_and(|current| Arc::ptr_eq(current, &catalog));
                if !unchanged {
                    reconciler.set_catalog(catalog);
                }
            }
            None => reconciler.clear_catalog(),
        }

        reconciler.synchronize(&devices)
    }

    async fn take_snapshot(&self) -> Result<Vec<O::Device>> {
        let Some(limit) = self.snapshot_timeout else {
            return self.observer.snapshot().await;
        };

        tokio::time::timeout(limit, self.observer.snapshot())
            .await
            .map_err(|_| Error::Timeout {
                millis: millis(limit),
            })?
    }

    /// Run [`tick`](Self::tick) every `interval` on a background task
    ///
    /// The first tick runs immediately. Failed ticks are logged and retried on
    /// the next interval. Monitoring stops when the returned handle is shut
    /// down or dropped.
    ///
    /// Fails with [`Error::Config`] if `interval` is zero.
    pub fn spawn(self, interval: Duration) -> Result<MonitorHandle> {
        if interval.is_zero() {
            return Err(Error::config("poll interval must be greater than zero"));
        }

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_ms = millis(interval), "Presence monitor started");

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.tick().await {
                            warn!(error = %e, retry = e.should_retry(), "Presence synchronization failed");
                        }
                    }
                }
            }

            info!("Presence monitor stopped");
        });

        Ok(MonitorHandle {
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Handle to a spawned [`PresenceMonitor`]
#[derive(Debug)]
pub struct MonitorHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop monitoring and wait for the current tick to finish
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            // The task may already have exited; nothing to signal then.
            let _ = tx.send(());
        }
        debug!("Waiting for presence monitor to stop");
        self.task
            .await
            .map_err(|e| Error::other(format!("Presence monitor task failed: {}", e)))
    }

    /// Check whether the monitoring task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
