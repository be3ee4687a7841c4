//! Error types for corral

use std::time::Duration;

use thiserror::Error;

/// Core error type for corral operations
///
/// Pool failures get their own variants so callers can branch on
/// recoverable conditions (a timed-out acquire) versus fatal ones
/// (startup could not build the pool) instead of matching on a
/// catch-all.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Pool initialization failed: {0}")]
    PoolInitialization(String),

    #[error("Timed out after {0:?} waiting for a pooled connection")]
    AcquireTimeout(Duration),

    #[error("Pool is closed")]
    PoolClosed,

    #[error("Failed to replace a broken connection: {0}")]
    Replacement(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the operation that produced this error is worth retrying.
    ///
    /// Only an acquire timeout qualifies: the pool was merely exhausted
    /// at the time. A closed pool or a failed replacement will not get
    /// better on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::AcquireTimeout(_))
    }
}

/// Result type alias for corral operations
pub type Result<T> = std::result::Result<T, Error>;
