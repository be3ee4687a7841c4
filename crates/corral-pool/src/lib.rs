//! Corral Pool - Fixed-capacity connection pooling
//!
//! This crate provides a fixed-capacity pool of database connections with
//! eager initialization, bounded blocking acquisition, transparent
//! replacement of broken connections, and ordered shutdown.
//!
//! The pool is the sole arbiter of connection lifetime: consumers borrow a
//! connection, use it, and give it back. Every other layer of an
//! application goes through that one contract.

pub mod pool;

pub use pool::{ConnectionFactory, Pool, PoolConfig, PoolStats, PooledConnection};
