//! Mutation gateway
//!
//! Applies a single create/update/delete to one entity and keeps the
//! cache consistent with minimal visible latency. Three write shapes:
//!
//! - **Optimistic insert** (public registration path): the record appears
//!   in the cache under a temporary id before the service confirms it;
//!   on failure the pre-insert snapshot is restored verbatim, counter
//!   included, and the error is returned to the caller.
//! - **Refresh-after-write** (admin collections): write remotely, then
//!   refresh that one collection. Simpler, and the latency is fine for
//!   admin-only operations.
//! - **Field-level optimistic update** (registration status): patch the
//!   cached row immediately, push the update without waiting; a failed
//!   push logs and re-synchronizes the collection from the source of
//!   truth instead of attempting fine-grained rollback.
//!
//! Any operation touching a derived aggregate (the registration total,
//! the gallery layout) adjusts it inside the same logical operation.

use crate::coordinator::SyncCoordinator;
use crate::error::SyncError;
use crate::gallery;
use crate::store::CacheStore;
use agora_client::{DataService, SelectFilter};
use agora_model::{Collection, NewRegistration, RecordId, Registration, RegistrationStatus};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Snapshot-before / apply / restore-on-error wrapper for speculative
/// cache changes. Captures the full collection snapshot and the derived
/// counter; `restore` puts both back exactly as they were.
struct Speculation {
    collection: Collection,
    rows: Vec<Value>,
    registration_total: i64,
}

impl Speculation {
    fn capture(store: &CacheStore, collection: Collection) -> Self {
        Self {
            collection,
            rows: store.rows(collection),
            registration_total: store.registration_total(),
        }
    }

    fn restore(self, store: &CacheStore) {
        store.replace(self.collection, self.rows);
        store.set_registration_total(self.registration_total);
    }
}

struct GatewayInner {
    service: Arc<dyn DataService>,
    store: Arc<CacheStore>,
    coordinator: SyncCoordinator,
    registration_cap: usize,
}

/// Write path to the remote data service.
#[derive(Clone)]
pub struct MutationGateway {
    inner: Arc<GatewayInner>,
}

impl MutationGateway {
    pub fn new(
        service: Arc<dyn DataService>,
        store: Arc<CacheStore>,
        coordinator: SyncCoordinator,
        registration_cap: usize,
    ) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                service,
                store,
                coordinator,
                registration_cap,
            }),
        }
    }

    // ========================================================================
    // Optimistic insert: public registration
    // ========================================================================

    /// Create a registration on the latency-sensitive public path. The
    /// row is visible in the cache immediately under a temporary id and
    /// the running total is bumped; both are fully reverted if the
    /// service rejects the insert.
    pub async fn create_registration(
        &self,
        input: NewRegistration,
    ) -> Result<Registration, SyncError> {
        let inner = &self.inner;
        let settings = inner.store.site_settings();

        let temp_id = format!("temp-{}", Uuid::new_v4());
        let mut row = serde_json::to_value(&input)?;
        {
            let obj = row
                .as_object_mut()
                .expect("NewRegistration serializes to an object");
            obj.insert("id".to_string(), Value::from(temp_id.clone()));
            obj.insert(
                "status".to_string(),
                Value::from(settings.registration_default_status.as_str()),
            );
            obj.insert(
                "created_at".to_string(),
                Value::from(Utc::now().to_rfc3339()),
            );
        }

        let txn = Speculation::capture(&inner.store, Collection::Registrations);
        inner
            .store
            .prepend(Collection::Registrations, row.clone(), inner.registration_cap);
        inner.store.add_registration_total(1);

        // The service assigns the real id.
        let mut outbound = row;
        if let Some(obj) = outbound.as_object_mut() {
            obj.remove("id");
        }

        match inner.service.insert(Collection::Registrations, outbound).await {
            Ok(server_row) => {
                let temp = RecordId::from(temp_id);
                if !inner
                    .store
                    .swap_row(Collection::Registrations, &temp, server_row.clone())
                {
                    // Row fell off the capped snapshot while in flight;
                    // the server copy is still authoritative.
                    warn!(id = %temp, "Temporary registration no longer cached");
                }
                let registration: Registration = serde_json::from_value(server_row)?;
                info!(id = %registration.id, "Registration created");
                Ok(registration)
            }
            Err(e) => {
                txn.restore(&inner.store);
                error!(error = %e, "Registration insert rejected, rolled back");
                Err(e.into())
            }
        }
    }

    // ========================================================================
    // Field-level optimistic update: registration status
    // ========================================================================

    /// Change a registration's status. The cached row is patched
    /// immediately; the remote update is issued without waiting. A failed
    /// update logs and resynchronizes the collection.
    pub fn set_registration_status(
        &self,
        id: RecordId,
        status: RegistrationStatus,
    ) -> JoinHandle<()> {
        let patch = json!({ "status": status.as_str() });
        self.inner
            .store
            .patch_row(Collection::Registrations, &id, &patch);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Err(e) = inner
                .service
                .update(Collection::Registrations, &id, patch)
                .await
            {
                error!(id = %id, error = %e, "Status update failed, resyncing registrations");
                if let Err(e) = inner.coordinator.resync(Collection::Registrations).await {
                    warn!(error = %e, "Resync after failed status update also failed");
                }
            }
        })
    }

    /// Hard-delete a registration (explicit admin action).
    pub async fn delete_registration(&self, id: &RecordId) -> Result<(), SyncError> {
        self.inner
            .service
            .delete(Collection::Registrations, id)
            .await?;
        self.inner.store.remove_row(Collection::Registrations, id);
        self.inner.store.add_registration_total(-1);
        Ok(())
    }

    // ========================================================================
    // Refresh-after-write: admin collections
    // ========================================================================

    /// Create a record in an admin-curated collection.
    pub async fn create(&self, collection: Collection, record: Value) -> Result<Value, SyncError> {
        let row = self.inner.service.insert(collection, record).await?;
        self.resync_after_write(collection).await;
        Ok(row)
    }

    /// Partially update a record in an admin-curated collection.
    pub async fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        partial: Value,
    ) -> Result<(), SyncError> {
        self.inner.service.update(collection, id, partial).await?;
        self.resync_after_write(collection).await;
        Ok(())
    }

    /// Delete a record from an admin-curated collection.
    pub async fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), SyncError> {
        self.inner.service.delete(collection, id).await?;
        self.resync_after_write(collection).await;
        Ok(())
    }

    /// The write succeeded; a failed refresh only means the cache stays
    /// stale until the next round.
    async fn resync_after_write(&self, collection: Collection) {
        if let Err(e) = self.inner.coordinator.resync(collection).await {
            warn!(collection = %collection, error = %e, "Refresh after write failed");
        }
    }

    // ========================================================================
    // Photo gallery: insert/delete + rebalance
    // ========================================================================

    /// Add a photo and rebalance the layout in the same logical operation.
    pub async fn add_photo(&self, record: Value) -> Result<Value, SyncError> {
        let row = self
            .inner
            .service
            .insert(Collection::PhotoGallery, record)
            .await?;
        self.resync_after_write(Collection::PhotoGallery).await;
        self.rebalance_gallery().await?;
        Ok(row)
    }

    /// Remove a photo and rebalance the layout.
    pub async fn remove_photo(&self, id: &RecordId) -> Result<(), SyncError> {
        self.inner
            .service
            .delete(Collection::PhotoGallery, id)
            .await?;
        self.resync_after_write(Collection::PhotoGallery).await;
        self.rebalance_gallery().await?;
        Ok(())
    }

    /// Recompute every photo's column from its stable order and write
    /// back only the labels that changed. Returns the number of update
    /// operations issued; running it again on an unchanged set issues
    /// zero.
    pub async fn rebalance_gallery(&self) -> Result<usize, SyncError> {
        let rows = self.inner.store.rows(Collection::PhotoGallery);
        let mut updates = 0;

        for (index, row) in rows.iter().enumerate() {
            let want = gallery::bucket_label(index);
            let current = row.get("bucket").and_then(Value::as_str).unwrap_or("");
            if current == want {
                continue;
            }
            let Some(id) = RecordId::of_row(row) else {
                warn!(index = index, "Gallery row without id, skipping");
                continue;
            };

            let patch = json!({ "bucket": want });
            self.inner
                .service
                .update(Collection::PhotoGallery, &id, patch.clone())
                .await?;
            self.inner
                .store
                .patch_row(Collection::PhotoGallery, &id, &patch);
            updates += 1;
        }

        if updates > 0 {
            info!(updates = updates, "Gallery rebalanced");
        }
        Ok(updates)
    }

    // ========================================================================
    // Derived counts
    // ========================================================================

    /// The denormalized public registration total.
    pub fn registration_total(&self) -> i64 {
        self.inner.store.registration_total()
    }

    /// Registrations awaiting approval, counted explicitly by status —
    /// rejected rows are excluded.
    pub async fn pending_registrations(&self) -> Result<u64, SyncError> {
        let count = self
            .inner
            .service
            .count(
                Collection::Registrations,
                &SelectFilter::new().eq("status", "pending"),
            )
            .await?;
        Ok(count)
    }
}
