//! Error types for the settlement assistant.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unknown step: {0}")]
    UnknownStep(String),
}

/// Key-value store errors.
///
/// The storage service never propagates these past its own boundary; they
/// exist so backends can report what went wrong before it is logged.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Store quota exceeded for key {key}")]
    QuotaExceeded { key: String },
}

/// Failures while producing an assistant reply.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Response backend {backend} failed: {reason}")]
    Backend { backend: String, reason: String },

    #[error("Response backend {backend} timed out after {timeout:?}")]
    Timeout { backend: String, timeout: Duration },

    #[error("Reply task aborted: {0}")]
    Aborted(String),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
