//! Agora - content-sync runtime for the community site
//!
//! Keeps the site's ~15 remote collections cached in-process and serves
//! them to the presentation layer:
//!
//! - **Sync**: staleness-driven refresh rounds, debounced realtime
//!   invalidation, optimistic mutations (`agora-sync`)
//! - **Boundaries**: hosted data backend, realtime feed, identity
//!   provider, object storage (`agora-client`)
//! - **Runtime**: configuration, boot sequence with stall timeout,
//!   connectivity monitor, route resolution, seeding, HTTP surface

pub mod config;
pub mod routing;
pub mod seed;
pub mod server;

pub use config::Args;
pub use server::{run, AppState};
