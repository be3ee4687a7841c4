//! Connection trait definition

use crate::Result;
use async_trait::async_trait;

/// A live handle to the external database
///
/// The pool treats connections as opaque: it only ever probes liveness,
/// closes them, and hands them out. Everything a consumer does with a
/// connection beyond that is between the consumer and the driver that
/// implemented this trait.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "sqlite", "postgresql", "mysql")
    fn driver_name(&self) -> &str;

    /// Probe whether the connection is still usable
    ///
    /// Implementations should perform a cheap round trip (e.g. `SELECT 1`)
    /// rather than trusting local state. The pool calls this before
    /// handing a connection to a caller and before re-admitting one to
    /// the idle set.
    async fn ping(&self) -> Result<()>;

    /// Close the connection
    ///
    /// Must be idempotent: closing an already-closed connection is a no-op.
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    ///
    /// A cheap local check, no I/O.
    fn is_closed(&self) -> bool;
}
