//! Pool configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a connection pool
///
/// Controls the fixed pool capacity and the acquire timeout. Capacity is
/// immutable once the pool is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of connections the pool creates at startup and maintains
    size: usize,
    /// Timeout in milliseconds when acquiring a connection from the pool
    acquire_timeout_ms: u64,
}

impl PoolConfig {
    /// Create a new pool configuration with the given size
    ///
    /// # Panics
    ///
    /// Panics if `size` is 0.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "pool size must be greater than 0, got {}", size);

        Self {
            size,
            acquire_timeout_ms: 30_000, // 30 seconds default
        }
    }

    /// Set the acquire timeout in milliseconds
    pub fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    /// Get the pool size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the acquire timeout as a Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Default for PoolConfig {
    /// Create a default pool configuration
    ///
    /// Defaults:
    /// - size: 10
    /// - acquire_timeout: 30 seconds
    fn default() -> Self {
        Self::new(10)
    }
}
