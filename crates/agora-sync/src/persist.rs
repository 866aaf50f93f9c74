//! Persisted snapshot fallback
//!
//! One collection snapshot (hackathons) survives restarts in a local sled
//! database so the first paint can happen before the network round
//! completes. The stored value is an opaque JSON blob — no query logic
//! lives here.

use crate::error::SyncError;
use agora_model::Collection;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

pub struct SnapshotStore {
    db: sled::Db,
}

impl SnapshotStore {
    pub fn open(path: &Path) -> Result<Self, SyncError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Persist a snapshot, overwriting any previous one.
    pub fn save(&self, collection: Collection, rows: &[Value]) -> Result<(), SyncError> {
        let bytes = serde_json::to_vec(rows)?;
        self.db.insert(collection.as_str(), bytes)?;
        self.db.flush()?;
        debug!(collection = %collection, rows = rows.len(), "Snapshot persisted");
        Ok(())
    }

    /// Load a persisted snapshot, if one exists.
    pub fn load(&self, collection: Collection) -> Result<Option<Vec<Value>>, SyncError> {
        match self.db.get(collection.as_str())? {
            Some(bytes) => {
                let rows: Vec<Value> = serde_json::from_slice(&bytes)?;
                Ok(Some(rows))
            }
            None => Ok(None),
        }
    }
}
