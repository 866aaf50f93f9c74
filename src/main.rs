//! Agora - content-sync runtime for the community site

use clap::Parser;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agora::config::Args;
use agora::{seed, server, server::AppState};
use agora_client::{
    AuthClient, DataService, HttpDataService, MemoryDataService, ObjectStore, RealtimeConfig,
    RealtimeFeed, ServiceConfig,
};
use agora_sync::{CacheStore, MutationGateway, SnapshotStore, SyncCoordinator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("agora={log_level},info").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Agora - community site runtime");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Backend: {}", args.backend_url);
    info!("Realtime: {}", args.realtime_url());
    info!("Cache TTL: {}s, debounce: {}ms", args.cache_ttl_secs, args.debounce_ms);
    info!("======================================");

    // Data service: in-memory in dev mode, hosted backend otherwise.
    let service_config = ServiceConfig {
        base_url: args.backend_url.clone(),
        api_key: args.backend_api_key.clone(),
        ..Default::default()
    };
    let service: Arc<dyn DataService> = if args.dev_mode {
        info!("Dev mode: using in-memory data service");
        Arc::new(MemoryDataService::new())
    } else {
        Arc::new(HttpDataService::new(service_config.clone()))
    };

    // Persisted snapshot fallback; degraded startup if unavailable.
    let snapshots = match SnapshotStore::open(&args.snapshot_dir) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(error = %e, "Snapshot store unavailable, continuing without persistence");
            None
        }
    };

    let store = Arc::new(CacheStore::new());
    let coordinator = SyncCoordinator::with_snapshots(
        service.clone(),
        store.clone(),
        args.sync_config(),
        snapshots,
    );
    let gateway = MutationGateway::new(
        service.clone(),
        store.clone(),
        coordinator.clone(),
        args.registration_cap,
    );

    // Instant first paint: restore the persisted hackathons snapshot
    // before any network round.
    coordinator.load_persisted();

    // Realtime change feed; dev mode has no channel to subscribe to.
    let connected_rx = if args.dev_mode {
        let (tx, rx) = watch::channel(true);
        drop(tx);
        rx
    } else {
        let (events_tx, mut events_rx) = mpsc::channel(64);
        let (feed, rx) = RealtimeFeed::new(
            RealtimeConfig {
                ws_url: args.realtime_url(),
                ..Default::default()
            },
            events_tx,
        );
        feed.spawn();

        // Pump change events into the coordinator as invalidations.
        let c = coordinator.clone();
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                c.notify_change(event.collection);
            }
        });
        rx
    };

    // Force a full refresh whenever connectivity comes back.
    {
        let mut rx = connected_rx.clone();
        let c = coordinator.clone();
        tokio::spawn(async move {
            let mut was_connected = *rx.borrow();
            while rx.changed().await.is_ok() {
                let connected = *rx.borrow();
                if connected && !was_connected {
                    c.on_connectivity_restored().await;
                }
                was_connected = connected;
            }
        });
    }

    // Dev mode starts from a seeded backend.
    if args.dev_mode {
        match seed::seed_all(&service, &gateway).await {
            Ok(n) => info!(inserted = n, "Dev seed complete"),
            Err(e) => warn!(error = %e, "Dev seed failed"),
        }
    }

    // Initial full load, bounded by the boot stall timeout. On timeout
    // the round keeps running in the background and the runtime serves
    // whatever partial cache exists.
    let boot = {
        let c = coordinator.clone();
        tokio::spawn(async move { c.refresh(true).await })
    };
    match tokio::time::timeout(args.boot_timeout(), boot).await {
        Ok(Ok(report)) => info!(
            refreshed = report.refreshed,
            failed = report.failed,
            "Initial load complete"
        ),
        Ok(Err(e)) => warn!(error = %e, "Initial load task failed"),
        Err(_) => warn!(
            timeout_ms = args.boot_timeout_ms,
            "Initial load still running, serving partial cache"
        ),
    }

    let auth = (!args.dev_mode).then(|| AuthClient::new(service_config.clone()));
    let objects = (!args.dev_mode).then(|| ObjectStore::new(service_config));

    let state = Arc::new(AppState {
        args,
        service,
        store,
        coordinator: coordinator.clone(),
        gateway,
        auth,
        objects,
        sessions: DashMap::new(),
        connected: connected_rx,
        started_at: Instant::now(),
    });

    let result = tokio::select! {
        r = server::run(state) => r,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
    };

    // Tear down pending timers (debounce, loading hold).
    coordinator.dispose();
    result
}
