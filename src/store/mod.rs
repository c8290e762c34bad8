use crate::config::{LeaseContention, LeasedbConfig};
use crate::engine;
use crate::error::LeasedbError;
use crate::lease::backend::LeaseService;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Reserved administrative statements. The store intercepts exactly these
/// two and routes them to the lease backend; a lease-aware engine build
/// resolves the same statements itself when they are forwarded verbatim.
pub const ACQUIRE_WRITE_LEASE: &str = "pragma leasedb_acquire_lease";
pub const RELEASE_WRITE_LEASE: &str = "pragma leasedb_release_lease";

#[derive(Debug)]
struct StoreInner {
    conn: Mutex<Connection>,
    identity: String,
    lease: LeaseService,
    contention: LeaseContention,
    acquire_timeout: Option<Duration>,
}

/// Handle to one database file plus the lease route that guards writes to
/// it. Cheap to clone; all clones share the same engine connection.
#[derive(Clone, Debug)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    pub fn open(
        path: &Path,
        config: &LeasedbConfig,
        lease: LeaseService,
    ) -> Result<Self, LeasedbError> {
        engine::initialize()?;
        let conn = Connection::open(path)?;
        conn.busy_timeout(config.busy_timeout())?;
        let identity = path.display().to_string();
        Ok(Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(conn),
                identity,
                lease,
                contention: config.lease_contention,
                acquire_timeout: config.lease_acquire_timeout(),
            }),
        })
    }

    /// Database identity the lease is bound to (the file path as opened).
    pub fn identity(&self) -> &str {
        &self.inner.identity
    }

    /// Administrative statement interface. The two reserved lease
    /// statements go to the configured backend; anything else is forwarded
    /// to the engine verbatim.
    pub async fn admin(&self, statement: &str) -> Result<(), LeasedbError> {
        match statement {
            ACQUIRE_WRITE_LEASE => match &self.inner.lease {
                LeaseService::InProcess(backend) => {
                    debug!(identity = %self.inner.identity, "acquiring write lease in-process");
                    backend
                        .acquire(
                            &self.inner.identity,
                            self.inner.contention,
                            self.inner.acquire_timeout,
                        )
                        .await
                }
                LeaseService::Engine => self.exec_forward(statement.to_string()).await,
            },
            RELEASE_WRITE_LEASE => match &self.inner.lease {
                LeaseService::InProcess(backend) => backend.release(&self.inner.identity),
                LeaseService::Engine => self.exec_forward(statement.to_string()).await,
            },
            other => self.exec_forward(other.to_string()).await,
        }
    }

    async fn exec_forward(&self, statement: String) -> Result<(), LeasedbError> {
        self.with_conn(move |conn| Ok(conn.execute_batch(&statement)?))
            .await
    }

    /// Runs `work` against the shared connection on the blocking pool. The
    /// connection mutex is held only for the duration of `work`.
    pub async fn with_conn<T, F>(&self, work: F) -> Result<T, LeasedbError>
    where
        F: FnOnce(&mut Connection) -> Result<T, LeasedbError> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut conn = inner.conn.lock();
            work(&mut conn)
        })
        .await
        .map_err(|e| LeasedbError::WorkerPanicked(e.to_string()))?
    }

    /// Synchronous release path for guard teardown, where no async context
    /// is available.
    pub(crate) fn release_blocking(&self) -> Result<(), LeasedbError> {
        match &self.inner.lease {
            LeaseService::InProcess(backend) => backend.release(&self.inner.identity),
            LeaseService::Engine => {
                let conn = self.inner.conn.lock();
                Ok(conn.execute_batch(RELEASE_WRITE_LEASE)?)
            }
        }
    }
}
