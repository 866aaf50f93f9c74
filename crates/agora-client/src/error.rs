//! Error types for the client boundaries

use thiserror::Error;

/// Client boundary error
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned an error
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Storage bucket absent (self-healed once before surfacing)
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// Sign-in rejected by the identity provider
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
