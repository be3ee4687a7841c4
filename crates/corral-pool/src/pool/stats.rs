//! Pool statistics types

use serde::{Deserialize, Serialize};

/// Statistics about a connection pool's current state
///
/// A consistent snapshot: `available + used == capacity` unless
/// replacement failures have degraded the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Total number of connections the pool currently manages
    capacity: usize,
    /// Number of idle connections available for checkout
    available: usize,
    /// Number of connections currently checked out
    used: usize,
    /// Number of callers waiting for a connection
    waiting: usize,
}

impl PoolStats {
    /// Create new pool statistics
    pub fn new(capacity: usize, available: usize, used: usize, waiting: usize) -> Self {
        Self {
            capacity,
            available,
            used,
            waiting,
        }
    }

    /// Get the pool capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of available connections
    pub fn available(&self) -> usize {
        self.available
    }

    /// Get the number of checked-out connections
    pub fn used(&self) -> usize {
        self.used
    }

    /// Get the number of waiting callers
    pub fn waiting(&self) -> usize {
        self.waiting
    }

    /// Calculate pool utilization as a fraction (0.0 to 1.0)
    ///
    /// Returns 0.0 if capacity is 0 to avoid division by zero.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.used as f64 / self.capacity as f64
        }
    }

    /// Check if every connection is checked out
    pub fn is_exhausted(&self) -> bool {
        self.available == 0 && self.capacity > 0
    }
}

impl Default for PoolStats {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}
