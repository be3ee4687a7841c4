//! Connection pool implementation

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use corral_core::{Connection, Error, Result};
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::config::PoolConfig;
use super::stats::PoolStats;

/// Factory trait for creating new connections
///
/// The factory is the only component that knows the connection
/// parameters; the pool asks it for fresh connections at startup and
/// whenever a broken one has to be replaced.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Create a new, fully initialized connection
    async fn connect(&self) -> Result<Arc<dyn Connection>>;

    /// Validate that a connection is still usable
    ///
    /// Default implementation checks the local closed flag and then runs
    /// the connection's liveness probe.
    async fn validate(&self, conn: &dyn Connection) -> bool {
        !conn.is_closed() && conn.ping().await.is_ok()
    }
}

#[async_trait]
impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    async fn connect(&self) -> Result<Arc<dyn Connection>> {
        (**self).connect().await
    }

    async fn validate(&self, conn: &dyn Connection) -> bool {
        (**self).validate(conn).await
    }
}

/// Pool lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolState {
    Initializing,
    Running,
    ShuttingDown,
    Closed,
}

/// The mutable heart of the pool
///
/// Both sets and the lifecycle state share one lock so that every
/// transition between them is atomic: a connection is never observable in
/// both sets, or in neither, and `available + used == capacity` holds at
/// every point the lock is released while running.
struct Ledger {
    state: PoolState,
    capacity: usize,
    available: VecDeque<Arc<dyn Connection>>,
    used: HashMap<u64, Arc<dyn Connection>>,
}

/// A fixed-capacity connection pool
///
/// All connections are created eagerly at startup. Callers borrow one
/// with [`acquire`](Pool::acquire) and give it back with
/// [`release`](Pool::release); a connection that fails its liveness probe
/// on either edge is replaced in its slot so capacity stays constant.
pub struct Pool {
    /// Pool configuration
    config: PoolConfig,
    /// Connection factory
    factory: Arc<dyn ConnectionFactory>,
    /// Lifecycle state plus the available/used sets
    ledger: Mutex<Ledger>,
    /// One permit per idle connection; bounds blocking acquires
    semaphore: Arc<Semaphore>,
    /// Number of callers waiting for a connection
    waiting_count: AtomicUsize,
    /// Lease ids for checked-out connections
    next_lease: AtomicU64,
}

impl Pool {
    /// Create a pool and eagerly open all of its connections
    ///
    /// If any connection cannot be created, the ones already opened are
    /// closed again and the whole initialization fails: there is no
    /// partially started pool.
    #[tracing::instrument(skip(config, factory), fields(size = config.size()))]
    pub async fn connect<F: ConnectionFactory>(config: PoolConfig, factory: F) -> Result<Self> {
        let size = config.size();
        let pool = Self {
            config,
            factory: Arc::new(factory),
            ledger: Mutex::new(Ledger {
                state: PoolState::Initializing,
                capacity: size,
                available: VecDeque::with_capacity(size),
                used: HashMap::new(),
            }),
            semaphore: Arc::new(Semaphore::new(size)),
            waiting_count: AtomicUsize::new(0),
            next_lease: AtomicU64::new(0),
        };

        for _ in 0..size {
            match pool.factory.connect().await {
                Ok(conn) => pool.ledger.lock().available.push_back(conn),
                Err(e) => {
                    let opened: Vec<_> = pool.ledger.lock().available.drain(..).collect();
                    for conn in opened {
                        let _ = conn.close().await;
                    }
                    tracing::error!(error = %e, "pool initialization failed");
                    return Err(Error::PoolInitialization(e.to_string()));
                }
            }
        }

        pool.ledger.lock().state = PoolState::Running;
        tracing::info!(capacity = size, "connection pool initialized");
        Ok(pool)
    }

    /// Borrow a connection from the pool
    ///
    /// Blocks until a connection is idle or the configured acquire
    /// timeout elapses. The returned connection has passed its liveness
    /// probe; one that failed it was closed and replaced before being
    /// handed out.
    ///
    /// Errors:
    /// - [`Error::PoolClosed`] immediately if the pool has shut down
    /// - [`Error::AcquireTimeout`] if no connection became idle in time
    /// - [`Error::Replacement`] if a dead connection could not be
    ///   replaced; the pool keeps running with one slot fewer
    pub async fn acquire(&self) -> Result<PooledConnection<'_>> {
        if self.ledger.lock().state != PoolState::Running {
            return Err(Error::PoolClosed);
        }

        let timeout = self.config.acquire_timeout();
        self.waiting_count.fetch_add(1, Ordering::SeqCst);
        let waited =
            tokio::time::timeout(timeout, self.semaphore.clone().acquire_owned()).await;
        self.waiting_count.fetch_sub(1, Ordering::SeqCst);

        let permit = match waited {
            Ok(Ok(permit)) => permit,
            // the semaphore is only closed by shutdown
            Ok(Err(_)) => return Err(Error::PoolClosed),
            Err(_) => return Err(Error::AcquireTimeout(timeout)),
        };

        let lease = self.next_lease.fetch_add(1, Ordering::SeqCst);
        let conn = {
            let mut ledger = self.ledger.lock();
            if ledger.state != PoolState::Running {
                return Err(Error::PoolClosed);
            }
            // a permit means an idle connection exists: permits track the
            // available set
            let Some(conn) = ledger.available.pop_front() else {
                return Err(Error::PoolClosed);
            };
            ledger.used.insert(lease, conn.clone());
            conn
        };

        let conn = if self.factory.validate(&*conn).await {
            conn
        } else {
            match self.replace_on_acquire(lease, conn).await {
                Ok(fresh) => fresh,
                Err(e) => {
                    permit.forget();
                    return Err(e);
                }
            }
        };

        // shutdown may have raced us while the probe ran and already
        // closed the connection; fail fast instead of handing it out
        let raced = {
            let mut ledger = self.ledger.lock();
            if ledger.state != PoolState::Running {
                ledger.used.remove(&lease);
                true
            } else {
                false
            }
        };
        if raced {
            let _ = conn.close().await;
            return Err(Error::PoolClosed);
        }

        Ok(PooledConnection {
            pool: self,
            lease,
            connection: Some(conn),
            permit: Some(permit),
        })
    }

    /// Retire a connection that failed its probe during acquire and put a
    /// fresh one in its slot
    async fn replace_on_acquire(
        &self,
        lease: u64,
        dead: Arc<dyn Connection>,
    ) -> Result<Arc<dyn Connection>> {
        tracing::debug!(lease, "retiring broken connection found during acquire");
        let _ = dead.close().await;

        match self.factory.connect().await {
            Ok(fresh) => {
                // same lease, same slot: the swap keeps capacity constant
                self.ledger.lock().used.insert(lease, fresh.clone());
                Ok(fresh)
            }
            Err(e) => {
                let mut ledger = self.ledger.lock();
                ledger.used.remove(&lease);
                ledger.capacity = ledger.capacity.saturating_sub(1);
                tracing::warn!(
                    error = %e,
                    capacity = ledger.capacity,
                    "failed to replace broken connection; pool capacity reduced"
                );
                Err(Error::Replacement(e.to_string()))
            }
        }
    }

    /// Return a borrowed connection to the pool
    ///
    /// Probes the connection first; a dead one is closed and a
    /// replacement takes its place in the idle set. Returns `false` only
    /// for a handle the pool does not recognize as checked out; a genuine
    /// release always returns `true`, even when replacing a dead
    /// connection failed (the caller's work is already done, so that
    /// failure is logged and absorbed).
    pub async fn release(&self, mut pooled: PooledConnection<'_>) -> bool {
        let Some(conn) = pooled.connection.take() else {
            return false;
        };
        let permit = pooled.permit.take();
        let lease = pooled.lease;
        drop(pooled); // drop guard is now inert

        if !self.ledger.lock().used.contains_key(&lease) {
            tracing::debug!(lease, "ignoring release of unrecognized connection");
            return false;
        }

        let returned = if self.factory.validate(&*conn).await {
            conn
        } else {
            tracing::debug!(lease, "retiring broken connection found during release");
            let _ = conn.close().await;
            match self.factory.connect().await {
                Ok(fresh) => fresh,
                Err(e) => {
                    let mut ledger = self.ledger.lock();
                    ledger.used.remove(&lease);
                    ledger.capacity = ledger.capacity.saturating_sub(1);
                    tracing::warn!(
                        error = %e,
                        capacity = ledger.capacity,
                        "failed to replace broken connection on release; pool capacity reduced"
                    );
                    if let Some(permit) = permit {
                        permit.forget();
                    }
                    return true;
                }
            }
        };

        let repooled = {
            let mut ledger = self.ledger.lock();
            if ledger.used.remove(&lease).is_some() && ledger.state == PoolState::Running {
                ledger.available.push_back(returned.clone());
                true
            } else {
                false
            }
        };
        if !repooled {
            // shutdown drained the checked-out set while we were probing;
            // this connection never made it back, so close it ourselves
            let _ = returned.close().await;
        }
        drop(permit); // wakes one waiter, if any
        true
    }

    /// Re-pool a connection whose handle was dropped without an explicit
    /// release
    ///
    /// Runs synchronously from `Drop`, so no probe happens here; the next
    /// acquire validates the connection and replaces it if needed.
    fn reclaim(&self, lease: u64, conn: Arc<dyn Connection>) {
        let mut ledger = self.ledger.lock();
        if ledger.used.remove(&lease).is_some() && ledger.state == PoolState::Running {
            ledger.available.push_back(conn);
        }
    }

    /// Borrow a connection, run the given unit of work, and release on
    /// every exit path
    ///
    /// This is the scoped form of the acquire/use/release contract:
    /// normal returns and error returns release explicitly, and a panic
    /// inside `work` still returns the connection via the handle's drop
    /// guard.
    pub async fn with_connection<T, Fut>(
        &self,
        work: impl FnOnce(Arc<dyn Connection>) -> Fut,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let pooled = self.acquire().await?;
        let result = work(pooled.connection()).await;
        self.release(pooled).await;
        result
    }

    /// Shut the pool down, closing every connection
    ///
    /// Closes idle and checked-out connections alike, and wakes every
    /// caller blocked in [`acquire`](Pool::acquire) with
    /// [`Error::PoolClosed`]. Idempotent: a second call is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) {
        let drained = {
            let mut ledger = self.ledger.lock();
            if ledger.state != PoolState::Running {
                tracing::debug!("shutdown called on a pool that is not running");
                return;
            }
            ledger.state = PoolState::ShuttingDown;
            let mut drained: Vec<Arc<dyn Connection>> = ledger.available.drain(..).collect();
            drained.extend(ledger.used.drain().map(|(_, conn)| conn));
            drained
        };

        // unblock every waiting acquirer with a fast error
        self.semaphore.close();

        for conn in drained {
            if let Err(e) = conn.close().await {
                tracing::debug!(error = %e, "error closing connection during shutdown");
            }
        }

        self.ledger.lock().state = PoolState::Closed;
        tracing::info!("connection pool shut down");
    }

    /// Get current pool statistics
    ///
    /// A consistent snapshot taken under one lock; never blocks on I/O
    /// and never mutates the pool.
    pub fn stats(&self) -> PoolStats {
        let waiting = self.waiting_count.load(Ordering::SeqCst);
        let ledger = self.ledger.lock();
        PoolStats::new(
            ledger.capacity,
            ledger.available.len(),
            ledger.used.len(),
            waiting,
        )
    }

    /// Get the pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

/// A connection borrowed from the pool
///
/// Give it back with [`Pool::release`]. If the handle is dropped instead
/// (early return, panic), the connection still finds its way back to the
/// pool, just without the release-time liveness probe.
pub struct PooledConnection<'a> {
    pool: &'a Pool,
    lease: u64,
    connection: Option<Arc<dyn Connection>>,
    permit: Option<OwnedSemaphorePermit>,
}

impl Deref for PooledConnection<'_> {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref().expect("connection taken").as_ref()
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.take() {
            self.pool.reclaim(self.lease, conn);
        }
        // the permit drops here and wakes a waiter
    }
}

impl PooledConnection<'_> {
    /// Get the underlying connection as an Arc
    pub fn connection(&self) -> Arc<dyn Connection> {
        self.connection.clone().expect("connection taken")
    }

    /// Build a handle that was never checked out of this pool
    ///
    /// Only used to verify that releasing a foreign connection is
    /// rejected without touching the sets.
    #[cfg(test)]
    pub(crate) fn detached(pool: &Pool, connection: Arc<dyn Connection>) -> PooledConnection<'_> {
        PooledConnection {
            pool,
            lease: u64::MAX,
            connection: Some(connection),
            permit: None,
        }
    }
}
