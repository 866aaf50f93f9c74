//! Seeding
//!
//! Inserts the fixed starter hackathons through the mutation gateway so a
//! fresh deployment has something on the events page. Idempotent: if the
//! collection is already non-empty, the whole run is skipped.

use agora_client::{DataService, SelectFilter};
use agora_model::Collection;
use agora_sync::{MutationGateway, SyncError};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// The starter hackathons.
pub fn seed_hackathons() -> Vec<Value> {
    vec![
        json!({
            "slug": "genesis-hack-2025",
            "title": "Genesis Hack 2025",
            "tagline": "The flagship 36-hour build marathon",
            "status": "upcoming",
            "mode": "offline",
            "is_public": true,
        }),
        json!({
            "slug": "monsoon-build-night",
            "title": "Monsoon Build Night",
            "tagline": "One evening, one working demo",
            "status": "upcoming",
            "mode": "hybrid",
            "is_public": true,
        }),
        json!({
            "slug": "winter-of-code",
            "title": "Winter of Code",
            "tagline": "A month of mentored open-source contributions",
            "status": "draft",
            "mode": "online",
            "is_public": true,
        }),
    ]
}

/// Seed the hackathon collection. Returns the number of rows inserted
/// (zero when the guard skips the run).
pub async fn seed_all(
    service: &Arc<dyn DataService>,
    gateway: &MutationGateway,
) -> Result<usize, SyncError> {
    let existing = service
        .count(Collection::Hackathons, &SelectFilter::new())
        .await?;
    if existing > 0 {
        info!(existing = existing, "Hackathons already present, skipping seed");
        return Ok(0);
    }

    let rows = seed_hackathons();
    let n = rows.len();
    for row in rows {
        gateway.create(Collection::Hackathons, row).await?;
    }
    info!(inserted = n, "Seeded starter hackathons");
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_client::MemoryDataService;
    use agora_sync::{CacheStore, SyncConfig, SyncCoordinator};
    use std::collections::HashSet;

    fn gateway_over(service: Arc<dyn DataService>) -> (MutationGateway, Arc<CacheStore>) {
        let store = Arc::new(CacheStore::new());
        let coordinator =
            SyncCoordinator::new(service.clone(), store.clone(), SyncConfig::default());
        (
            MutationGateway::new(service, store.clone(), coordinator, 50),
            store,
        )
    }

    #[tokio::test]
    async fn test_seed_all_from_empty() {
        let service: Arc<dyn DataService> = Arc::new(MemoryDataService::new());
        let (gateway, store) = gateway_over(service.clone());

        let inserted = seed_all(&service, &gateway).await.unwrap();
        assert_eq!(inserted, 3);
        assert_eq!(
            service
                .count(Collection::Hackathons, &SelectFilter::new())
                .await
                .unwrap(),
            3
        );
        // Refresh-after-write already populated the cache.
        assert_eq!(store.row_count(Collection::Hackathons), 3);
    }

    #[tokio::test]
    async fn test_second_seed_is_skipped() {
        let service: Arc<dyn DataService> = Arc::new(MemoryDataService::new());
        let (gateway, _) = gateway_over(service.clone());

        seed_all(&service, &gateway).await.unwrap();
        let inserted = seed_all(&service, &gateway).await.unwrap();
        assert_eq!(inserted, 0);

        // No duplicate titles after the second run.
        let rows = service
            .select(Collection::Hackathons, &SelectFilter::new())
            .await
            .unwrap();
        let titles: HashSet<_> = rows
            .iter()
            .map(|r| r["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles.len(), rows.len());
        assert_eq!(rows.len(), 3);
    }
}
