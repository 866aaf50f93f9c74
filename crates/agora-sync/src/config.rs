//! Sync layer configuration

use std::time::Duration;

/// Timing and bounds for the sync layer.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How long a successful refresh keeps a collection fresh (default: 30 s)
    pub cache_ttl: Duration,
    /// Quiet window after the last push notification before the debounced
    /// refresh runs (default: 2000 ms)
    pub debounce: Duration,
    /// Minimum time the global loading indicator stays visible on an
    /// initial or forced refresh (default: 500 ms)
    pub min_loading: Duration,
    /// Cap on the cached registrations snapshot, newest first (default: 50)
    pub registration_cap: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
            debounce: Duration::from_millis(2000),
            min_loading: Duration::from_millis(500),
            registration_cap: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.debounce, Duration::from_millis(2000));
        assert_eq!(config.min_loading, Duration::from_millis(500));
        assert_eq!(config.registration_cap, 50);
    }
}
