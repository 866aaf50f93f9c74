//! Configuration for the Agora runtime
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Agora - content-sync runtime for the community site
#[derive(Parser, Debug, Clone)]
#[command(name = "agora")]
#[command(about = "Content-sync runtime for the Agora community site")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Base URL of the hosted data backend
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:8080")]
    pub backend_url: String,

    /// API key for the data backend
    #[arg(long, env = "BACKEND_API_KEY")]
    pub backend_api_key: Option<String>,

    /// WebSocket URL of the realtime change feed
    /// (derived from BACKEND_URL if not set)
    #[arg(long, env = "REALTIME_URL")]
    pub realtime_url: Option<String>,

    /// Directory for the persisted snapshot database
    #[arg(long, env = "SNAPSHOT_DIR", default_value = "./data/agora")]
    pub snapshot_dir: PathBuf,

    /// Storage bucket for admin uploads
    #[arg(long, env = "UPLOAD_BUCKET", default_value = "media")]
    pub upload_bucket: String,

    /// Enable development mode (in-memory backend, auth gate disabled)
    #[arg(long, env = "DEV_MODE", default_value = "false", action = clap::ArgAction::Set)]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Seconds a successful refresh keeps a collection fresh
    #[arg(long, env = "CACHE_TTL_SECS", default_value = "30")]
    pub cache_ttl_secs: u64,

    /// Quiet window after the last push notification before the debounced
    /// refresh runs, in milliseconds
    #[arg(long, env = "DEBOUNCE_MS", default_value = "2000")]
    pub debounce_ms: u64,

    /// Minimum visible duration of the loading indicator on forced and
    /// initial refreshes, in milliseconds
    #[arg(long, env = "MIN_LOADING_MS", default_value = "500")]
    pub min_loading_ms: u64,

    /// Cap on the cached registrations snapshot
    #[arg(long, env = "REGISTRATION_CAP", default_value = "50")]
    pub registration_cap: usize,

    /// How long the boot sequence waits for the initial full load before
    /// serving whatever partial cache exists, in milliseconds
    #[arg(long, env = "BOOT_TIMEOUT_MS", default_value = "10000")]
    pub boot_timeout_ms: u64,
}

impl Args {
    /// Effective realtime URL (derived from the backend URL if unset).
    pub fn realtime_url(&self) -> String {
        match self.realtime_url {
            Some(ref url) => url.clone(),
            None => {
                let ws_base = self
                    .backend_url
                    .replacen("https://", "wss://", 1)
                    .replacen("http://", "ws://", 1);
                format!("{ws_base}/realtime/v1")
            }
        }
    }

    pub fn sync_config(&self) -> agora_sync::SyncConfig {
        agora_sync::SyncConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            debounce: Duration::from_millis(self.debounce_ms),
            min_loading: Duration::from_millis(self.min_loading_ms),
            registration_cap: self.registration_cap,
        }
    }

    pub fn boot_timeout(&self) -> Duration {
        Duration::from_millis(self.boot_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.backend_api_key.is_none() {
            return Err("BACKEND_API_KEY is required outside dev mode".to_string());
        }
        if self.registration_cap == 0 {
            return Err("REGISTRATION_CAP must be at least 1".to_string());
        }
        if self.boot_timeout_ms == 0 {
            return Err("BOOT_TIMEOUT_MS must be positive".to_string());
        }
        Ok(())
    }
}
