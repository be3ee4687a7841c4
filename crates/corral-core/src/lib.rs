//! Corral Core - Core abstractions for the corral connection pool
//!
//! This crate provides the fundamental traits and types the pool and its
//! consumers depend on:
//!
//! - `Connection` - Trait for pooled database connections
//! - `ConnectConfig` - Connection target and credentials
//! - `Error` / `Result` - Shared error taxonomy

mod config;
mod connection;
mod error;

pub use config::*;
pub use connection::*;
pub use error::*;
