//! Fixed-capacity connection pooling
//!
//! This module provides a connection pool that creates all of its
//! connections up front and keeps the total constant: a connection found
//! dead is replaced in its slot rather than dropped from the roster.
//!
//! # Example
//!
//! ```ignore
//! use corral_pool::{Pool, PoolConfig};
//!
//! let config = PoolConfig::new(10).with_acquire_timeout_ms(5000);
//! let pool = Pool::connect(config, connection_factory).await?;
//!
//! let conn = pool.acquire().await?;
//! // Use connection...
//! pool.release(conn).await;
//!
//! // Or let the pool manage the borrow:
//! pool.with_connection(|conn| async move {
//!     // Use connection...
//!     Ok(())
//! })
//! .await?;
//! ```

mod config;
mod pool;
mod stats;


pub use config::PoolConfig;
pub use pool::{ConnectionFactory, Pool, PooledConnection};
pub use stats::PoolStats;
