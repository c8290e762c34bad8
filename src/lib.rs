pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod lease;
pub mod migration;
pub mod records;
pub mod store;
pub mod sync_bridge;

use crate::config::{LeaseRoute, LeasedbConfig};
use crate::error::LeasedbError;
use crate::lease::backend::{InProcessLease, LeaseService};
use crate::lease::{LeaseCoordinator, LeaseCounters};
use crate::migration::{MigrationReport, builtin_migrations, current_version, run};
use crate::records::{InsertReceipt, RecentRecords, insert_value, recent};
use crate::store::Store;
use std::path::Path;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// A single opened database with its write lease plumbing.
///
/// Every write goes through [`LeasedbInstance::with_write_lease`]; reads go
/// straight to the store connection. Opening runs the schema replay under
/// the same lease discipline as any other write.
#[derive(Debug)]
pub struct LeasedbInstance {
    config: LeasedbConfig,
    store: Store,
    lease: LeaseCoordinator,
    /// Serializes write brackets inside this process so concurrent local
    /// callers queue here instead of contending for the lease itself.
    write_serial: Mutex<()>,
    startup_migration: MigrationReport,
}

impl LeasedbInstance {
    /// Opens the store at `path`, wiring the lease backend the configured
    /// route selects, and replays any pending schema steps.
    pub async fn open(
        config: LeasedbConfig,
        path: impl AsRef<Path>,
    ) -> Result<Self, LeasedbError> {
        let lease = match config.lease_route {
            LeaseRoute::Engine => LeaseService::Engine,
            LeaseRoute::InProcess => LeaseService::InProcess(InProcessLease::new()),
        };
        Self::open_internal(config, path.as_ref(), lease).await
    }

    /// Opens with a caller-supplied in-process backend, so several
    /// instances can share one lease namespace.
    pub async fn open_with_lease(
        config: LeasedbConfig,
        path: impl AsRef<Path>,
        backend: InProcessLease,
    ) -> Result<Self, LeasedbError> {
        Self::open_internal(config, path.as_ref(), LeaseService::InProcess(backend)).await
    }

    async fn open_internal(
        config: LeasedbConfig,
        path: &Path,
        lease: LeaseService,
    ) -> Result<Self, LeasedbError> {
        validate_config(&config)?;
        info!(
            lease_route = ?config.lease_route,
            lease_contention = ?config.lease_contention,
            lease_acquire_timeout_ms = ?config.lease_acquire_timeout_ms,
            busy_timeout_ms = config.busy_timeout_ms,
            fetch_window = config.fetch_window,
            "leasedb config"
        );
        let store = Store::open(path, &config, lease)?;
        let coordinator = LeaseCoordinator::new(store.clone());
        let mut instance = Self {
            config,
            store,
            lease: coordinator,
            write_serial: Mutex::new(()),
            startup_migration: MigrationReport {
                was_fresh: false,
                applied: Vec::new(),
                version: 0,
            },
        };

        let set = builtin_migrations();
        let report = instance
            .with_write_lease(move |conn| run(conn, &set))
            .await?;
        info!(
            identity = %instance.store.identity(),
            fresh = report.was_fresh,
            version = report.version,
            steps_applied = report.applied.len(),
            "leasedb open"
        );
        instance.startup_migration = report;
        Ok(instance)
    }

    /// Runs `work` inside a write bracket: queue locally, acquire the
    /// write lease, run the work on the store connection, then release.
    ///
    /// The release always happens. When the work succeeded but the release
    /// did not, the bracket fails with `ReleaseFailed` so callers never
    /// mistake a possibly-still-held lease for a clean bracket. When both
    /// failed, the work error wins and the release failure is logged.
    pub async fn with_write_lease<T, F>(&self, work: F) -> Result<T, LeasedbError>
    where
        T: Send + 'static,
        F: FnOnce(&mut rusqlite::Connection) -> Result<T, LeasedbError> + Send + 'static,
    {
        let _serial = self.write_serial.lock().await;
        let guard = self.lease.acquire().await?;
        let outcome = self.store.with_conn(work).await;
        match (outcome, guard.release().await) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release_err)) => Err(release_err),
            (Err(work_err), Ok(())) => Err(work_err),
            (Err(work_err), Err(release_err)) => {
                warn!(
                    identity = %self.store.identity(),
                    error = %release_err,
                    "write lease release failed while surfacing a work error"
                );
                Err(work_err)
            }
        }
    }

    /// Inserts one record inside a write bracket. The receipt carries the
    /// new row id and the wall time of the whole bracket, lease wait
    /// included.
    pub async fn insert_record(&self, value: i64) -> Result<InsertReceipt, LeasedbError> {
        let started = Instant::now();
        let record_id = self
            .with_write_lease(move |conn| insert_value(conn, value))
            .await?;
        Ok(InsertReceipt {
            record_id,
            latency: started.elapsed(),
        })
    }

    /// Reads the newest records through the configured window without
    /// touching the lease.
    pub async fn fetch_recent(&self) -> Result<RecentRecords, LeasedbError> {
        self.fetch_recent_with_limit(self.config.fetch_window).await
    }

    pub async fn fetch_recent_with_limit(
        &self,
        limit: usize,
    ) -> Result<RecentRecords, LeasedbError> {
        let started = Instant::now();
        let records = self
            .store
            .with_conn(move |conn| recent(conn, limit))
            .await?;
        Ok(RecentRecords {
            records,
            latency: started.elapsed(),
        })
    }

    /// Persisted schema version, read fresh from the store.
    pub async fn schema_version(&self) -> Result<i64, LeasedbError> {
        self.store.with_conn(|conn| current_version(conn)).await
    }

    pub fn lease_metrics(&self) -> LeaseCounters {
        self.lease.counters()
    }

    /// What the schema replay did when this instance opened.
    pub fn startup_migration(&self) -> &MigrationReport {
        &self.startup_migration
    }

    pub fn fetch_window(&self) -> usize {
        self.config.fetch_window
    }

    /// Database identity the write lease is scoped to.
    pub fn identity(&self) -> &str {
        self.store.identity()
    }
}

fn validate_config(config: &LeasedbConfig) -> Result<(), LeasedbError> {
    if config.fetch_window == 0 {
        return Err(LeasedbError::InvalidConfig {
            message: "fetch_window must be at least 1".into(),
        });
    }
    if config.fetch_window > 10_000 {
        return Err(LeasedbError::InvalidConfig {
            message: format!(
                "fetch_window {} exceeds the 10000 row ceiling",
                config.fetch_window
            ),
        });
    }
    if config.lease_acquire_timeout_ms == Some(0) {
        return Err(LeasedbError::InvalidConfig {
            message: "lease_acquire_timeout_ms must be positive when set".into(),
        });
    }
    Ok(())
}
