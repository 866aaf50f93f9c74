//! Error types for the sync layer

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Remote boundary failure
    #[error("Client error: {0}")]
    Client(#[from] agora_client::ClientError),

    /// JSON error at a typed boundary
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local snapshot persistence failure
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] sled::Error),
}
