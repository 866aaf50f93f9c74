//! Client boundaries for the Agora runtime
//!
//! Everything external the runtime talks to lives behind this crate:
//!
//! - **DataService** - per-collection select/insert/update/delete/count
//!   against the hosted relational backend ([`HttpDataService`]), plus an
//!   in-memory implementation ([`MemoryDataService`]) used in dev mode and
//!   tests.
//! - **RealtimeFeed** - WebSocket consumer for row-level change events,
//!   forwarded as pure invalidation signals.
//! - **AuthClient** - sign-in/sign-out against the identity provider,
//!   yielding the session token the admin gate holds.
//! - **ObjectStore** - file uploads with a one-shot missing-bucket
//!   self-heal.
//!
//! # Example
//!
//! ```rust,no_run
//! use agora_client::{HttpDataService, ServiceConfig, DataService, SelectFilter};
//! use agora_model::Collection;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = HttpDataService::new(ServiceConfig {
//!     base_url: "https://backend.example.org".into(),
//!     ..Default::default()
//! });
//!
//! let rows = service
//!     .select(Collection::Hackathons, &SelectFilter::new())
//!     .await?;
//! println!("{} hackathons", rows.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod data;
pub mod error;
pub mod http;
pub mod memory;
pub mod realtime;
pub mod storage;

// Re-export main types
pub use auth::{AuthClient, Session};
pub use data::{DataService, SelectFilter, ServiceConfig, SortOrder};
pub use error::{ClientError, Result};
pub use http::HttpDataService;
pub use memory::MemoryDataService;
pub use realtime::{RealtimeConfig, RealtimeFeed};
pub use storage::ObjectStore;
