//! Sync layer integration tests
//!
//! Exercises the coordinator and mutation gateway end to end against an
//! instrumented in-memory data service:
//! - refresh rounds, staleness, failure isolation
//! - loading gate minimum hold
//! - debounced push invalidation
//! - optimistic insert with full rollback
//! - field-level optimistic update with resync on failure
//! - gallery rebalancing idempotence
//! - persisted snapshot restore

use agora_client::{ClientError, DataService, MemoryDataService, SelectFilter};
use agora_model::{Collection, NewRegistration, RecordId, RegistrationStatus};
use agora_sync::{CacheStore, MutationGateway, SnapshotStore, SyncConfig, SyncCoordinator};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// Instrumented service: forwards to MemoryDataService, counts selects,
// injects failures per path
// =============================================================================

#[derive(Default)]
struct InstrumentedService {
    inner: MemoryDataService,
    selects: DashMap<Collection, usize>,
    fail_selects: DashMap<Collection, bool>,
    fail_inserts: AtomicBool,
    fail_updates: AtomicBool,
}

impl InstrumentedService {
    fn new() -> Self {
        Self {
            inner: MemoryDataService::new(),
            ..Default::default()
        }
    }

    fn select_count(&self, collection: Collection) -> usize {
        self.selects.get(&collection).map(|c| *c).unwrap_or(0)
    }

    fn set_select_failure(&self, collection: Collection, fail: bool) {
        self.fail_selects.insert(collection, fail);
    }
}

#[async_trait]
impl DataService for InstrumentedService {
    async fn select(&self, collection: Collection, filter: &SelectFilter) -> agora_client::Result<Vec<Value>> {
        *self.selects.entry(collection).or_insert(0) += 1;
        if self.fail_selects.get(&collection).map(|f| *f).unwrap_or(false) {
            return Err(ClientError::Server {
                status: 500,
                message: "injected select failure".into(),
            });
        }
        self.inner.select(collection, filter).await
    }

    async fn insert(&self, collection: Collection, record: Value) -> agora_client::Result<Value> {
        if self.fail_inserts.load(Ordering::Relaxed) {
            return Err(ClientError::Server {
                status: 500,
                message: "injected insert failure".into(),
            });
        }
        self.inner.insert(collection, record).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        partial: Value,
    ) -> agora_client::Result<()> {
        if self.fail_updates.load(Ordering::Relaxed) {
            return Err(ClientError::Server {
                status: 500,
                message: "injected update failure".into(),
            });
        }
        self.inner.update(collection, id, partial).await
    }

    async fn delete(&self, collection: Collection, id: &RecordId) -> agora_client::Result<()> {
        self.inner.delete(collection, id).await
    }

    async fn count(&self, collection: Collection, filter: &SelectFilter) -> agora_client::Result<u64> {
        self.inner.count(collection, filter).await
    }
}

// =============================================================================
// Harness
// =============================================================================

fn fast_config() -> SyncConfig {
    SyncConfig {
        cache_ttl: Duration::from_secs(60),
        debounce: Duration::from_millis(50),
        min_loading: Duration::from_millis(80),
        registration_cap: 50,
    }
}

struct Harness {
    service: Arc<InstrumentedService>,
    store: Arc<CacheStore>,
    coordinator: SyncCoordinator,
    gateway: MutationGateway,
}

fn harness_with(config: SyncConfig) -> Harness {
    let service = Arc::new(InstrumentedService::new());
    let store = Arc::new(CacheStore::new());
    let dyn_service: Arc<dyn DataService> = service.clone();
    let coordinator = SyncCoordinator::new(dyn_service.clone(), store.clone(), config.clone());
    let gateway = MutationGateway::new(
        dyn_service,
        store.clone(),
        coordinator.clone(),
        config.registration_cap,
    );
    Harness {
        service,
        store,
        coordinator,
        gateway,
    }
}

fn harness() -> Harness {
    harness_with(fast_config())
}

async fn seed_basics(service: &InstrumentedService) {
    for i in 0..3 {
        service
            .inner
            .insert(
                Collection::Hackathons,
                json!({"slug": format!("hack-{i}"), "title": format!("Hack {i}")}),
            )
            .await
            .unwrap();
    }
    for i in 0..7 {
        service
            .inner
            .insert(Collection::Tags, json!({"name": format!("tag-{i}")}))
            .await
            .unwrap();
    }
}

// =============================================================================
// Refresh rounds and staleness
// =============================================================================

#[tokio::test]
async fn test_refresh_populates_all_collections() {
    let h = harness();
    seed_basics(&h.service).await;

    let report = h.coordinator.refresh(true).await;
    assert_eq!(report.refreshed, Collection::ALL.len());
    assert_eq!(report.failed, 0);

    assert_eq!(h.store.row_count(Collection::Hackathons), 3);
    assert_eq!(h.store.row_count(Collection::Tags), 7);
    assert_eq!(h.store.row_count(Collection::Workshops), 0);
    assert!(h.store.has_snapshot(Collection::Workshops));
}

#[tokio::test]
async fn test_cache_count_matches_service_count() {
    let h = harness();
    seed_basics(&h.service).await;
    h.coordinator.refresh(true).await;

    let service_count = h
        .service
        .count(Collection::Tags, &SelectFilter::new())
        .await
        .unwrap();
    assert_eq!(h.store.row_count(Collection::Tags) as u64, service_count);
}

#[tokio::test]
async fn test_registration_cap_and_exact_total() {
    let h = harness();
    for i in 0..60 {
        h.service
            .inner
            .insert(
                Collection::Registrations,
                json!({"name": format!("r{i}"), "status": "pending", "email": "x@y.z", "category": "student"}),
            )
            .await
            .unwrap();
    }

    h.coordinator.refresh(true).await;

    // Snapshot truncates at the documented cap; the counter holds the
    // exact service total.
    assert_eq!(h.store.row_count(Collection::Registrations), 50);
    assert_eq!(h.store.registration_total(), 60);
}

#[tokio::test]
async fn test_fresh_collections_are_skipped() {
    let h = harness();
    h.coordinator.refresh(true).await;
    let selects_before = h.service.select_count(Collection::Hackathons);

    let report = h.coordinator.refresh(false).await;
    assert_eq!(report.skipped, Collection::ALL.len());
    assert_eq!(report.refreshed, 0);
    assert_eq!(h.service.select_count(Collection::Hackathons), selects_before);
}

#[tokio::test]
async fn test_failed_collection_keeps_snapshot_and_stays_stale() {
    let h = harness();
    seed_basics(&h.service).await;
    h.coordinator.refresh(true).await;
    assert_eq!(h.store.row_count(Collection::Hackathons), 3);

    // Next round: hackathons fail, everything else succeeds.
    h.service.set_select_failure(Collection::Hackathons, true);
    let report = h.coordinator.refresh(true).await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.refreshed, Collection::ALL.len() - 1);

    // Last-known-good snapshot survives the failure.
    assert_eq!(h.store.row_count(Collection::Hackathons), 3);

    // Staleness did not advance: a background round retries only the
    // failed collection.
    h.service.set_select_failure(Collection::Hackathons, false);
    let tags_before = h.service.select_count(Collection::Tags);
    let hack_before = h.service.select_count(Collection::Hackathons);
    let report = h.coordinator.refresh(false).await;
    assert_eq!(report.refreshed, 1);
    assert_eq!(h.service.select_count(Collection::Hackathons), hack_before + 1);
    assert_eq!(h.service.select_count(Collection::Tags), tags_before);
}

// =============================================================================
// Loading gate
// =============================================================================

#[tokio::test]
async fn test_forced_refresh_holds_loading_for_minimum_duration() {
    let h = harness();
    let mut rx = h.store.subscribe_loading();

    let started = Instant::now();
    let coordinator = h.coordinator.clone();
    let round = tokio::spawn(async move { coordinator.refresh(true).await });

    // The gate goes up, then comes down only after the hold.
    rx.wait_for(|loading| *loading).await.unwrap();
    rx.wait_for(|loading| !*loading).await.unwrap();
    round.await.unwrap();

    // The fetch resolves near-instantly; the round still takes at least
    // the minimum visible duration.
    assert!(started.elapsed() >= Duration::from_millis(80));
    assert!(!h.store.is_loading());
}

#[tokio::test]
async fn test_background_refresh_never_toggles_loading() {
    let mut config = fast_config();
    config.cache_ttl = Duration::ZERO; // everything is always due
    let h = harness_with(config);

    h.coordinator.refresh(true).await; // initial load
    let mut rx = h.store.subscribe_loading();
    let _ = rx.borrow_and_update();

    let report = h.coordinator.refresh(false).await;
    assert_eq!(report.refreshed, Collection::ALL.len());
    assert!(!rx.has_changed().unwrap());
    assert!(!h.store.is_loading());
}

// =============================================================================
// Debounced push invalidation
// =============================================================================

#[tokio::test]
async fn test_notifications_within_window_collapse_to_one_round() {
    let h = harness();
    h.coordinator.refresh(true).await;

    let hack_before = h.service.select_count(Collection::Hackathons);
    let work_before = h.service.select_count(Collection::Workshops);
    let tags_before = h.service.select_count(Collection::Tags);

    // A burst of events for the same collection plus one for another;
    // each cancels-and-reschedules the pending task.
    for _ in 0..5 {
        h.coordinator.notify_change(Collection::Hackathons);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    h.coordinator.notify_change(Collection::Workshops);

    tokio::time::sleep(Duration::from_millis(200)).await;

    // Exactly one round, covering everything invalidated meanwhile.
    assert_eq!(h.service.select_count(Collection::Hackathons), hack_before + 1);
    assert_eq!(h.service.select_count(Collection::Workshops), work_before + 1);
    assert_eq!(h.service.select_count(Collection::Tags), tags_before);
}

#[tokio::test]
async fn test_dispose_cancels_pending_debounce() {
    let h = harness();
    h.coordinator.refresh(true).await;
    let before = h.service.select_count(Collection::Hackathons);

    h.coordinator.notify_change(Collection::Hackathons);
    h.coordinator.dispose();
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(h.service.select_count(Collection::Hackathons), before);
}

#[tokio::test]
async fn test_connectivity_restored_forces_full_refresh() {
    let h = harness();
    h.coordinator.refresh(true).await;
    let before = h.service.select_count(Collection::Tags);

    let report = h.coordinator.on_connectivity_restored().await;
    assert_eq!(report.refreshed, Collection::ALL.len());
    assert_eq!(h.service.select_count(Collection::Tags), before + 1);
}

// =============================================================================
// Optimistic registration insert
// =============================================================================

fn new_registration(name: &str) -> NewRegistration {
    NewRegistration {
        name: name.to_string(),
        category: "student".to_string(),
        email: format!("{name}@example.org"),
        hackathon_id: None,
        responses: None,
    }
}

#[tokio::test]
async fn test_optimistic_insert_confirms_server_row() {
    let h = harness();
    h.coordinator.refresh(true).await;

    let registration = h
        .gateway
        .create_registration(new_registration("asha"))
        .await
        .unwrap();

    // Temporary id replaced by the server-assigned one.
    assert!(matches!(registration.id, RecordId::Int(_)));
    let rows = h.store.rows(Collection::Registrations);
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["id"].is_i64());
    assert_eq!(rows[0]["status"], "pending");
    assert_eq!(h.store.registration_total(), 1);
}

#[tokio::test]
async fn test_optimistic_insert_rollback_restores_cache_and_counter() {
    let h = harness();
    for i in 0..4 {
        h.service
            .inner
            .insert(
                Collection::Registrations,
                json!({"name": format!("r{i}"), "status": "approved", "email": "x@y.z", "category": "student"}),
            )
            .await
            .unwrap();
    }
    h.coordinator.refresh(true).await;

    let ids_before: Vec<_> = h
        .store
        .rows(Collection::Registrations)
        .iter()
        .map(|r| RecordId::of_row(r).unwrap())
        .collect();
    let total_before = h.store.registration_total();

    h.service.fail_inserts.store(true, Ordering::Relaxed);
    let result = h.gateway.create_registration(new_registration("bo")).await;
    assert!(result.is_err());

    // Cache contains exactly the same records as before the attempt, and
    // the speculatively bumped counter is back.
    let ids_after: Vec<_> = h
        .store
        .rows(Collection::Registrations)
        .iter()
        .map(|r| RecordId::of_row(r).unwrap())
        .collect();
    assert_eq!(ids_after, ids_before);
    assert_eq!(h.store.registration_total(), total_before);
}

// =============================================================================
// Field-level optimistic status update
// =============================================================================

#[tokio::test]
async fn test_status_update_applies_immediately() {
    let h = harness();
    let row = h
        .service
        .inner
        .insert(
            Collection::Registrations,
            json!({"name": "asha", "status": "pending", "email": "a@b.c", "category": "student"}),
        )
        .await
        .unwrap();
    let id = RecordId::of_row(&row).unwrap();
    h.coordinator.refresh(true).await;

    let handle = h
        .gateway
        .set_registration_status(id.clone(), RegistrationStatus::Approved);

    // Patched locally before the remote call settles.
    let cached = h.store.rows(Collection::Registrations);
    assert_eq!(cached[0]["status"], "approved");

    handle.await.unwrap();
    let remote = h
        .service
        .inner
        .select(Collection::Registrations, &SelectFilter::new())
        .await
        .unwrap();
    assert_eq!(remote[0]["status"], "approved");
}

#[tokio::test]
async fn test_status_update_failure_resyncs_from_source_of_truth() {
    let h = harness();
    let row = h
        .service
        .inner
        .insert(
            Collection::Registrations,
            json!({"name": "asha", "status": "pending", "email": "a@b.c", "category": "student"}),
        )
        .await
        .unwrap();
    let id = RecordId::of_row(&row).unwrap();
    h.coordinator.refresh(true).await;

    h.service.fail_updates.store(true, Ordering::Relaxed);
    let handle = h
        .gateway
        .set_registration_status(id, RegistrationStatus::Rejected);

    // Optimistic patch lands first...
    assert_eq!(h.store.rows(Collection::Registrations)[0]["status"], "rejected");

    // ...then the failed push triggers a resync back to the server state.
    handle.await.unwrap();
    assert_eq!(h.store.rows(Collection::Registrations)[0]["status"], "pending");
}

#[tokio::test]
async fn test_delete_registration_adjusts_counter() {
    let h = harness();
    let row = h
        .service
        .inner
        .insert(
            Collection::Registrations,
            json!({"name": "asha", "status": "pending", "email": "a@b.c", "category": "student"}),
        )
        .await
        .unwrap();
    let id = RecordId::of_row(&row).unwrap();
    h.coordinator.refresh(true).await;
    assert_eq!(h.store.registration_total(), 1);

    h.gateway.delete_registration(&id).await.unwrap();
    assert_eq!(h.store.row_count(Collection::Registrations), 0);
    assert_eq!(h.store.registration_total(), 0);
}

#[tokio::test]
async fn test_pending_count_is_explicit_not_approximated() {
    let h = harness();
    for status in ["pending", "approved", "rejected", "pending"] {
        h.service
            .inner
            .insert(
                Collection::Registrations,
                json!({"name": "r", "status": status, "email": "a@b.c", "category": "student"}),
            )
            .await
            .unwrap();
    }
    h.coordinator.refresh(true).await;

    // total - approved would report 3; the explicit count excludes the
    // rejected row.
    assert_eq!(h.gateway.pending_registrations().await.unwrap(), 2);
    assert_eq!(h.store.pending_registration_count(), 2);
}

// =============================================================================
// Refresh-after-write
// =============================================================================

#[tokio::test]
async fn test_admin_create_refreshes_collection() {
    let h = harness();
    h.coordinator.refresh(true).await;

    h.gateway
        .create(Collection::Tags, json!({"name": "systems"}))
        .await
        .unwrap();

    let rows = h.store.rows(Collection::Tags);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "systems");
}

#[tokio::test]
async fn test_admin_write_failure_leaves_cache_untouched() {
    let h = harness();
    seed_basics(&h.service).await;
    h.coordinator.refresh(true).await;

    h.service.fail_inserts.store(true, Ordering::Relaxed);
    let result = h.gateway.create(Collection::Tags, json!({"name": "x"})).await;
    assert!(result.is_err());
    assert_eq!(h.store.row_count(Collection::Tags), 7);
}

// =============================================================================
// Gallery rebalancing
// =============================================================================

async fn seed_photos(h: &Harness, n: usize) {
    for i in 0..n {
        h.service
            .inner
            .insert(
                Collection::PhotoGallery,
                json!({"url": format!("https://cdn.example.org/p/{i}.jpg")}),
            )
            .await
            .unwrap();
    }
    h.coordinator.refresh(true).await;
}

fn bucket_counts(rows: &[Value]) -> Vec<usize> {
    ["col_1", "col_2", "col_3", "col_4", "col_5"]
        .iter()
        .map(|label| {
            rows.iter()
                .filter(|r| r.get("bucket").and_then(Value::as_str) == Some(label))
                .count()
        })
        .collect()
}

#[tokio::test]
async fn test_rebalance_fills_buckets_with_overflow_in_last() {
    let h = harness();
    seed_photos(&h, 16).await;

    let updates = h.gateway.rebalance_gallery().await.unwrap();
    assert_eq!(updates, 16);

    let rows = h.store.rows(Collection::PhotoGallery);
    // 2/3/4/3/2 capacities; the two overflow items spill into the last.
    assert_eq!(bucket_counts(&rows), vec![2, 3, 4, 3, 4]);
}

#[tokio::test]
async fn test_rebalance_is_idempotent() {
    let h = harness();
    seed_photos(&h, 10).await;

    let first = h.gateway.rebalance_gallery().await.unwrap();
    assert!(first > 0);

    // Unchanged item set: the second pass issues zero update operations.
    let second = h.gateway.rebalance_gallery().await.unwrap();
    assert_eq!(second, 0);
}

#[tokio::test]
async fn test_remove_photo_rebalances_remaining_items() {
    let h = harness();
    seed_photos(&h, 15).await;
    h.gateway.rebalance_gallery().await.unwrap();

    let first = h.store.rows(Collection::PhotoGallery)[0].clone();
    let first_id = RecordId::of_row(&first).unwrap();
    h.gateway.remove_photo(&first_id).await.unwrap();

    let rows = h.store.rows(Collection::PhotoGallery);
    assert_eq!(rows.len(), 14);
    assert_eq!(bucket_counts(&rows), vec![2, 3, 4, 3, 2]);
}

// =============================================================================
// Persisted snapshot fallback
// =============================================================================

#[tokio::test]
async fn test_persisted_hackathons_restored_before_first_round() {
    let dir = tempfile::TempDir::new().unwrap();

    // First run: refresh and persist.
    {
        let service = Arc::new(InstrumentedService::new());
        seed_basics(&service).await;
        let store = Arc::new(CacheStore::new());
        let snapshots = SnapshotStore::open(dir.path()).unwrap();
        let coordinator = SyncCoordinator::with_snapshots(
            service.clone() as Arc<dyn DataService>,
            store,
            fast_config(),
            Some(snapshots),
        );
        coordinator.refresh(true).await;
    }

    // Second run: the snapshot is available before any network round.
    let service = Arc::new(InstrumentedService::new());
    let store = Arc::new(CacheStore::new());
    let snapshots = SnapshotStore::open(dir.path()).unwrap();
    let coordinator = SyncCoordinator::with_snapshots(
        service.clone() as Arc<dyn DataService>,
        store.clone(),
        fast_config(),
        Some(snapshots),
    );
    coordinator.load_persisted();

    assert_eq!(store.row_count(Collection::Hackathons), 3);
    assert_eq!(service.select_count(Collection::Hackathons), 0);
}
