//! Agora Sync - the data synchronization layer
//!
//! A process-wide cache mediating between the presentation layer and the
//! remote data service, with staleness tracking, debounced invalidation
//! from push notifications, and optimistic local mutation.
//!
//! # Architecture
//!
//! ```text
//! Realtime feed ──change events──► SyncCoordinator ──select──► DataService
//!                                    │    ▲                       │
//!                            replace │    │ stale?                │
//!                                    ▼    │                       │
//!                                  CacheStore ◄── StalenessTracker┘
//!                                    ▲
//!                  optimistic/eager  │
//! Presentation ──► MutationGateway ──┴──insert/update/delete──► DataService
//! ```
//!
//! Data flows one way into the cache under refresh (service → cache →
//! presentation), and presentation → gateway → service → cache under
//! mutation. Every snapshot write is a whole-collection replace; every
//! row write is a whole-record swap. Refresh failures leave the previous
//! snapshot in place — stale-but-available beats empty.
//!
//! The coordinator is an explicitly constructed object with a
//! `dispose()` lifecycle; tests build isolated instances.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod gallery;
pub mod gateway;
pub mod persist;
pub mod staleness;
pub mod store;

// Re-export main types
pub use config::SyncConfig;
pub use coordinator::{RefreshReport, SyncCoordinator};
pub use error::SyncError;
pub use gateway::MutationGateway;
pub use persist::SnapshotStore;
pub use staleness::StalenessTracker;
pub use store::CacheStore;
