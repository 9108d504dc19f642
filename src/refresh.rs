//! Refresh cycles: pull updates from a source and apply them to the store

use crate::errors::{MonitorError, Result};
use crate::source::UpdateSource;
use crate::store::{ApplyOutcome, MonitoringStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// Store shared between the refresh task and readers
pub type SharedStore = Arc<RwLock<MonitoringStore>>;

pub fn shared(store: MonitoringStore) -> SharedStore {
    Arc::new(RwLock::new(store))
}

/// Result of one completed refresh cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub cycle_id: String,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub outcome: ApplyOutcome,
}

impl RefreshReport {
    pub fn has_changes(&self) -> bool {
        !self.outcome.changed_urls.is_empty()
    }
}

/// Clears the refreshing flag of a cycle that is dropped before it finishes,
/// e.g. when `refresh_once` is cancelled by a surrounding timeout or select.
struct CycleGuard {
    store: SharedStore,
    cycle_id: Option<String>,
}

impl CycleGuard {
    fn new(store: SharedStore, cycle_id: String) -> Self {
        Self {
            store,
            cycle_id: Some(cycle_id),
        }
    }

    fn disarm(&mut self) {
        self.cycle_id = None;
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        let Some(cycle_id) = self.cycle_id.take() else {
            return;
        };
        warn!("Refresh cycle {} abandoned before completion", cycle_id);

        if let Ok(mut store) = self.store.try_write() {
            release_cycle(&mut store, &cycle_id);
            return;
        }

        // Lock is busy; finish the release on the runtime once it frees up
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = Arc::clone(&self.store);
                handle.spawn(async move {
                    let mut store = store.write().await;
                    release_cycle(&mut store, &cycle_id);
                });
            }
            Err(_) => error!("No runtime to release refresh cycle {}", cycle_id),
        }
    }
}

/// End `cycle_id` if it is still the running cycle
fn release_cycle(store: &mut MonitoringStore, cycle_id: &str) {
    if store
        .current_refresh()
        .is_some_and(|ticket| ticket.cycle_id == cycle_id)
    {
        store.end_refresh();
    }
}

/// Drives `begin_refresh` / `apply_update` / `end_refresh` against a shared
/// store.
///
/// Updates for a cycle are collected before the store is locked for writing,
/// so readers see either the previous state or the whole new cycle.
pub struct RefreshCoordinator {
    store: SharedStore,
    source: Arc<dyn UpdateSource>,
    source_timeout: Duration,
}

impl RefreshCoordinator {
    pub fn new(store: SharedStore, source: Arc<dyn UpdateSource>, source_timeout: Duration) -> Self {
        Self {
            store,
            source,
            source_timeout,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Run a single refresh cycle.
    ///
    /// Fails with `RefreshInProgress` if another cycle holds the flag. A source
    /// error or timeout leaves the snapshot as it was.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn refresh_once(&self) -> Result<RefreshReport> {
        let ticket = self.store.write().await.begin_refresh()?;
        let mut guard = CycleGuard::new(Arc::clone(&self.store), ticket.cycle_id.clone());
        info!("Starting refresh cycle {}", ticket.cycle_id);

        let fetched = match timeout(self.source_timeout, self.source.fetch_updates()).await {
            Ok(result) => result,
            Err(_) => Err(MonitorError::Timeout(self.source_timeout)),
        };

        let mut store = self.store.write().await;
        let result = match fetched {
            Ok(updates) => {
                let completed_at = Utc::now();
                let outcome = store.apply_update_at(updates, completed_at);
                info!(
                    "Refresh cycle {} complete: {} records, {} changed",
                    ticket.cycle_id,
                    outcome.total(),
                    outcome.changed_urls.len()
                );
                Ok(RefreshReport {
                    cycle_id: ticket.cycle_id.clone(),
                    source: self.source.name().to_string(),
                    started_at: ticket.started_at,
                    completed_at,
                    outcome,
                })
            }
            Err(e) => {
                error!("Refresh cycle {} failed: {}", ticket.cycle_id, e);
                Err(e)
            }
        };
        store.end_refresh();
        guard.disarm();

        result
    }

    /// Refresh every `every` until `shutdown` resolves, sending each completed
    /// cycle's report to `reports`. The first cycle runs one period after the
    /// call. Returns the number of cycles that completed successfully.
    pub async fn run<F>(
        &self,
        every: Duration,
        shutdown: F,
        reports: mpsc::UnboundedSender<RefreshReport>,
    ) -> usize
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut completed = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping refresh loop after {} cycles", completed);
                    return completed;
                }
                _ = ticker.tick() => {
                    match self.refresh_once().await {
                        Ok(report) => {
                            completed += 1;
                            if reports.send(report).is_err() {
                                debug!("Report receiver dropped, discarding refresh report");
                            }
                        }
                        Err(MonitorError::RefreshInProgress) => {
                            warn!("Skipping tick, previous refresh still running");
                        }
                        Err(e) => warn!("Refresh failed, will retry next tick: {}", e),
                    }
                }
            }
        }
    }
}
