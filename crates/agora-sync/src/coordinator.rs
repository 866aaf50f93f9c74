//! Sync coordinator
//!
//! Keeps the entity caches reasonably fresh without redundant traffic:
//!
//! - `refresh(force)` fans out one fetch per due collection and joins the
//!   round; collections refresh independently and one failure never
//!   aborts the others.
//! - Push notifications invalidate a collection immediately and schedule
//!   a single debounced refresh; new events within the window
//!   cancel-and-reschedule the pending task rather than stacking timers.
//! - Initial and forced refreshes raise the global loading gate and hold
//!   it for a minimum duration so the indicator never flickers;
//!   background rounds leave the gate alone.
//! - Restored connectivity triggers an immediate forced round.
//!
//! Within a round, collections settle in any order; the round completes
//! only after all of them have. Across rounds, last-write-wins on the
//! cache is acceptable because every collection refresh is a full
//! replace, never a merge.

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::persist::SnapshotStore;
use crate::staleness::StalenessTracker;
use crate::store::CacheStore;
use agora_client::{DataService, SelectFilter};
use agora_model::Collection;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of one refresh round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Collections refreshed successfully
    pub refreshed: usize,
    /// Collections whose fetch failed (cache and staleness untouched)
    pub failed: usize,
    /// Collections skipped as still fresh
    pub skipped: usize,
}

struct CoordinatorInner {
    service: Arc<dyn DataService>,
    store: Arc<CacheStore>,
    staleness: StalenessTracker,
    config: SyncConfig,
    snapshots: Option<SnapshotStore>,
    /// Pending debounced refresh, cancel-and-rescheduled on every event.
    debounce: Mutex<Option<JoinHandle<()>>>,
    /// Set once any collection has ever refreshed successfully.
    any_fetched: AtomicBool,
    disposed: AtomicBool,
}

/// Orchestrates refresh of all known collections.
///
/// Explicitly constructed, cheaply cloneable (shared inner state), torn
/// down with [`SyncCoordinator::dispose`].
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl SyncCoordinator {
    pub fn new(service: Arc<dyn DataService>, store: Arc<CacheStore>, config: SyncConfig) -> Self {
        Self::with_snapshots(service, store, config, None)
    }

    pub fn with_snapshots(
        service: Arc<dyn DataService>,
        store: Arc<CacheStore>,
        config: SyncConfig,
        snapshots: Option<SnapshotStore>,
    ) -> Self {
        let staleness = StalenessTracker::new(config.cache_ttl);
        Self {
            inner: Arc::new(CoordinatorInner {
                service,
                store,
                staleness,
                config,
                snapshots,
                debounce: Mutex::new(None),
                any_fetched: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.inner.store
    }

    /// Load the persisted hackathons snapshot into the cache, if present.
    /// Called at boot, before the first network round; a corrupt or
    /// missing snapshot is logged and ignored. The snapshot does not mark
    /// the collection fresh — the first round still refetches it.
    pub fn load_persisted(&self) {
        let Some(ref snapshots) = self.inner.snapshots else {
            return;
        };
        match snapshots.load(Collection::Hackathons) {
            Ok(Some(rows)) => {
                info!(rows = rows.len(), "Restored persisted hackathons snapshot");
                self.inner.store.replace(Collection::Hackathons, rows);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Ignoring unreadable persisted snapshot"),
        }
    }

    /// Refresh every due collection; all of them when forced. Returns
    /// after every participating collection has settled.
    pub async fn refresh(&self, force: bool) -> RefreshReport {
        self.inner.refresh(force).await
    }

    /// Unconditionally refresh one collection (refresh-after-write path).
    pub async fn resync(&self, collection: Collection) -> Result<usize, SyncError> {
        let n = self.inner.refresh_collection(collection).await?;
        Ok(n)
    }

    /// Handle a push notification: invalidate now, refresh after the
    /// debounce window closes. Multiple events within the window collapse
    /// into one round covering everything invalidated meanwhile.
    pub fn notify_change(&self, collection: Collection) {
        if self.inner.disposed.load(Ordering::Relaxed) {
            return;
        }
        self.inner.staleness.invalidate(collection);
        debug!(collection = %collection, "Invalidated by push notification");

        let inner = Arc::clone(&self.inner);
        let delay = inner.config.debounce;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.refresh(false).await;
        });

        let mut slot = self.inner.debounce.lock().expect("debounce slot poisoned");
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    /// A period of network unavailability just ended; refetch everything.
    pub async fn on_connectivity_restored(&self) -> RefreshReport {
        info!("Connectivity restored, forcing full refresh");
        self.refresh(true).await
    }

    /// Per-collection seconds-since-refresh, for the status endpoint.
    pub fn freshness(&self) -> std::collections::HashMap<&'static str, u64> {
        self.inner.staleness.age_secs()
    }

    /// Cancel the pending debounced refresh and stop accepting work.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::Relaxed);
        let mut slot = self.inner.debounce.lock().expect("debounce slot poisoned");
        if let Some(task) = slot.take() {
            task.abort();
        }
        debug!("Sync coordinator disposed");
    }
}

impl CoordinatorInner {
    async fn refresh(&self, force: bool) -> RefreshReport {
        if self.disposed.load(Ordering::Relaxed) {
            return RefreshReport {
                skipped: Collection::ALL.len(),
                ..Default::default()
            };
        }

        let initial = !self.any_fetched.load(Ordering::Relaxed);
        let due: Vec<Collection> = Collection::ALL
            .iter()
            .copied()
            .filter(|c| force || self.staleness.is_stale(*c))
            .collect();
        let skipped = Collection::ALL.len() - due.len();

        if due.is_empty() {
            return RefreshReport {
                skipped,
                ..Default::default()
            };
        }

        // Only an initial or forced round may touch the loading gate.
        let show_loading = force || initial;
        let started = Instant::now();
        if show_loading {
            self.store.set_loading(true);
        }

        debug!(due = due.len(), force = force, initial = initial, "Refresh round started");
        let results = join_all(due.iter().map(|c| self.refresh_collection(*c))).await;

        let mut refreshed = 0;
        let mut failed = 0;
        for (collection, result) in due.iter().zip(results) {
            match result {
                Ok(rows) => {
                    refreshed += 1;
                    debug!(collection = %collection, rows = rows, "Collection refreshed");
                }
                Err(e) => {
                    failed += 1;
                    warn!(collection = %collection, error = %e, "Collection refresh failed, keeping last-known-good snapshot");
                }
            }
        }

        if show_loading {
            // Hold the indicator up to the minimum visible duration.
            let remaining = self.config.min_loading.saturating_sub(started.elapsed());
            if !remaining.is_zero() {
                tokio::time::sleep(remaining).await;
            }
            self.store.set_loading(false);
        }

        info!(refreshed = refreshed, failed = failed, skipped = skipped, "Refresh round complete");
        RefreshReport {
            refreshed,
            failed,
            skipped,
        }
    }

    async fn refresh_collection(&self, collection: Collection) -> Result<usize, SyncError> {
        let filter = default_filter(collection, &self.config);
        let rows = self.service.select(collection, &filter).await?;

        if collection == Collection::Registrations {
            // The snapshot is capped; the public counter needs the exact
            // total. A failed count keeps the previous value.
            match self.service.count(collection, &SelectFilter::new()).await {
                Ok(total) => self.store.set_registration_total(total as i64),
                Err(e) => warn!(error = %e, "Registration count failed, keeping previous total"),
            }
        }

        let n = rows.len();
        if collection == Collection::Hackathons {
            if let Some(ref snapshots) = self.snapshots {
                if let Err(e) = snapshots.save(collection, &rows) {
                    warn!(error = %e, "Failed to persist hackathons snapshot");
                }
            }
        }

        self.store.replace(collection, rows);
        self.staleness.mark_fresh(collection);
        self.any_fetched.store(true, Ordering::Relaxed);
        Ok(n)
    }
}

/// The query each collection refreshes with. Registrations are newest
/// first and capped; explicitly ordered collections come back in display
/// order; the gallery comes back in stable insertion order.
fn default_filter(collection: Collection, config: &SyncConfig) -> SelectFilter {
    match collection {
        Collection::Registrations => SelectFilter::new()
            .order_desc("created_at")
            .limit(config.registration_cap as u32),
        Collection::PhotoGallery => SelectFilter::new().order_asc("id"),
        Collection::SuccessStories
        | Collection::Chapters
        | Collection::WhatWeDoCards
        | Collection::FlagshipEvents => SelectFilter::new().order_asc("position"),
        _ => SelectFilter::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters() {
        let config = SyncConfig::default();
        let reg = default_filter(Collection::Registrations, &config);
        assert_eq!(reg.limit, Some(50));

        let gallery = default_filter(Collection::PhotoGallery, &config);
        assert!(gallery.order_by.is_some());
        assert!(gallery.limit.is_none());

        assert!(default_filter(Collection::Hackathons, &config).is_empty());
    }
}
