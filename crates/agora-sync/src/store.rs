//! Entity cache store
//!
//! One in-memory snapshot per collection. A snapshot is always either the
//! full current admin-visible record set or the previous valid one — the
//! only full-snapshot writer is [`CacheStore::replace`], and row-level
//! writers swap whole records. Visibility flags (`is_public`,
//! `is_featured`) never gate what the cache holds; filtering is the
//! presentation layer's job.
//!
//! The store also carries the two presentation signals that belong to the
//! data layer: the global loading gate (a watch channel the coordinator
//! drives) and the denormalized total-registrations counter.

use agora_model::{Collection, RecordId, SiteSettings};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Process-wide entity caches.
pub struct CacheStore {
    snapshots: DashMap<Collection, Vec<Value>>,
    loading: watch::Sender<bool>,
    registration_total: AtomicI64,
}

impl CacheStore {
    pub fn new() -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            snapshots: DashMap::new(),
            loading,
            registration_total: AtomicI64::new(0),
        }
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Current snapshot of a collection (empty if never fetched).
    pub fn rows(&self, collection: Collection) -> Vec<Value> {
        self.snapshots
            .get(&collection)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Atomic whole-snapshot replace.
    pub fn replace(&self, collection: Collection, rows: Vec<Value>) {
        debug!(collection = %collection, rows = rows.len(), "Snapshot replaced");
        self.snapshots.insert(collection, rows);
    }

    pub fn row_count(&self, collection: Collection) -> usize {
        self.snapshots
            .get(&collection)
            .map(|r| r.len())
            .unwrap_or(0)
    }

    pub fn has_snapshot(&self, collection: Collection) -> bool {
        self.snapshots.contains_key(&collection)
    }

    /// First row whose `field` equals `value` (string compare).
    pub fn find_by(&self, collection: Collection, field: &str, value: &str) -> Option<Value> {
        self.snapshots.get(&collection).and_then(|rows| {
            rows.iter()
                .find(|r| r.get(field).and_then(Value::as_str) == Some(value))
                .cloned()
        })
    }

    // ========================================================================
    // Row-level writers (mutation gateway only)
    // ========================================================================

    /// Prepend a row, truncating the snapshot to `cap`.
    pub fn prepend(&self, collection: Collection, row: Value, cap: usize) {
        let mut rows = self.snapshots.entry(collection).or_default();
        rows.insert(0, row);
        rows.truncate(cap);
    }

    /// Merge `partial`'s fields into the row with the given id.
    pub fn patch_row(&self, collection: Collection, id: &RecordId, partial: &Value) -> bool {
        let Some(fields) = partial.as_object() else {
            return false;
        };
        let Some(mut rows) = self.snapshots.get_mut(&collection) else {
            return false;
        };
        let Some(row) = rows
            .iter_mut()
            .find(|r| RecordId::of_row(r).as_ref() == Some(id))
        else {
            return false;
        };
        if let Some(obj) = row.as_object_mut() {
            for (k, v) in fields {
                obj.insert(k.clone(), v.clone());
            }
            return true;
        }
        false
    }

    /// Replace the whole row with the given id (temp → server-confirmed).
    pub fn swap_row(&self, collection: Collection, id: &RecordId, new_row: Value) -> bool {
        let Some(mut rows) = self.snapshots.get_mut(&collection) else {
            return false;
        };
        match rows
            .iter_mut()
            .find(|r| RecordId::of_row(r).as_ref() == Some(id))
        {
            Some(row) => {
                *row = new_row;
                true
            }
            None => false,
        }
    }

    pub fn remove_row(&self, collection: Collection, id: &RecordId) -> bool {
        let Some(mut rows) = self.snapshots.get_mut(&collection) else {
            return false;
        };
        let before = rows.len();
        rows.retain(|r| RecordId::of_row(r).as_ref() != Some(id));
        rows.len() != before
    }

    // ========================================================================
    // Loading gate
    // ========================================================================

    pub fn set_loading(&self, loading: bool) {
        self.loading.send_replace(loading);
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Subscribe to loading-state transitions.
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    // ========================================================================
    // Denormalized aggregates
    // ========================================================================

    /// The public "total registrations" counter. Set from the service's
    /// exact count on refresh, adjusted speculatively by optimistic
    /// inserts.
    pub fn registration_total(&self) -> i64 {
        self.registration_total.load(Ordering::Relaxed)
    }

    pub fn set_registration_total(&self, total: i64) {
        self.registration_total.store(total, Ordering::Relaxed);
    }

    pub fn add_registration_total(&self, delta: i64) {
        self.registration_total.fetch_add(delta, Ordering::Relaxed);
    }

    /// Pending registrations currently in cache. An explicit status count,
    /// not a `total - approved` approximation.
    pub fn pending_registration_count(&self) -> usize {
        self.snapshots
            .get(&Collection::Registrations)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.get("status").and_then(Value::as_str) == Some("pending"))
                    .count()
            })
            .unwrap_or(0)
    }

    // ========================================================================
    // Typed accessors
    // ========================================================================

    /// Typed view of the settings snapshot. Unmapped keys are logged here,
    /// at the deserialization boundary.
    pub fn site_settings(&self) -> SiteSettings {
        let rows = self.rows(Collection::SiteSettings);
        let (settings, errors) = SiteSettings::from_rows(&rows);
        for e in errors {
            warn!(error = %e, "Settings row not applied");
        }
        settings
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}
