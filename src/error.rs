//! Crate-wide error type.
//!
//! Resolution-path failures never travel through this enum — tier misses,
//! fetch failures, and store outages are typed locally (`FetchError`,
//! `StoreUnavailable`, `Unavailable`) so the coordinator's fall-through
//! logic stays explicit. `VitiError` covers everything outside the hot
//! path: configuration, client construction, and server startup.

use thiserror::Error;

/// Errors surfaced outside the request resolution path.
#[derive(Debug, Error)]
pub enum VitiError {
    /// Invalid or unusable configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server failed to bind or serve.
    #[error("Server error: {0}")]
    Server(String),
}

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VitiError>;
