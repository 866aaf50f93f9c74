//! Staleness tracking
//!
//! Records, per collection, when the last successful refresh finished. A
//! collection with no entry — never fetched, or invalidated by a push
//! notification — is stale by definition.

use agora_model::Collection;
use dashmap::DashMap;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct StalenessTracker {
    last_refresh: DashMap<Collection, Instant>,
    ttl: Duration,
}

impl StalenessTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            last_refresh: DashMap::new(),
            ttl,
        }
    }

    /// Whether a refresh is due for this collection.
    pub fn is_stale(&self, collection: Collection) -> bool {
        self.last_refresh
            .get(&collection)
            .map(|at| at.elapsed() > self.ttl)
            .unwrap_or(true)
    }

    /// Record a successful refresh. Failed refreshes never call this, so
    /// the collection stays eligible for the next round.
    pub fn mark_fresh(&self, collection: Collection) {
        self.last_refresh.insert(collection, Instant::now());
    }

    /// Drop the entry so the next refresh round includes the collection.
    pub fn invalidate(&self, collection: Collection) {
        self.last_refresh.remove(&collection);
    }

    /// Seconds since the last successful refresh, per collection that has
    /// one. Feeds the status endpoint.
    pub fn age_secs(&self) -> HashMap<&'static str, u64> {
        self.last_refresh
            .iter()
            .map(|e| (e.key().as_str(), e.value().elapsed().as_secs()))
            .collect()
    }
}
