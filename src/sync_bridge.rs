use crate::LeasedbInstance;
use crate::config::LeasedbConfig;
use crate::error::LeasedbError;
use crate::lease::LeaseCounters;
use crate::migration::MigrationReport;
use crate::records::{InsertReceipt, RecentRecords};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;

pub fn block_on_leasedb<F, T>(rt: &Handle, f: F) -> T
where
    F: Future<Output = T>,
{
    match Handle::try_current() {
        Ok(_) => tokio::task::block_in_place(|| rt.block_on(f)),
        Err(_) => rt.block_on(f),
    }
}

/// Blocking facade for callers without an async context of their own.
pub struct LeasedbSync {
    inner: Arc<LeasedbInstance>,
    rt: Handle,
}

impl LeasedbSync {
    pub fn new(inner: Arc<LeasedbInstance>, rt: Handle) -> Self {
        Self { inner, rt }
    }

    pub fn open(
        config: LeasedbConfig,
        path: impl AsRef<Path>,
        rt: Handle,
    ) -> Result<Self, LeasedbError> {
        let instance = block_on_leasedb(&rt, LeasedbInstance::open(config, path))?;
        Ok(Self {
            inner: Arc::new(instance),
            rt,
        })
    }

    pub fn with_write_lease<T, F>(&self, work: F) -> Result<T, LeasedbError>
    where
        T: Send + 'static,
        F: FnOnce(&mut rusqlite::Connection) -> Result<T, LeasedbError> + Send + 'static,
    {
        block_on_leasedb(&self.rt, self.inner.with_write_lease(work))
    }

    pub fn insert_record(&self, value: i64) -> Result<InsertReceipt, LeasedbError> {
        block_on_leasedb(&self.rt, self.inner.insert_record(value))
    }

    pub fn fetch_recent(&self) -> Result<RecentRecords, LeasedbError> {
        block_on_leasedb(&self.rt, self.inner.fetch_recent())
    }

    pub fn fetch_recent_with_limit(&self, limit: usize) -> Result<RecentRecords, LeasedbError> {
        block_on_leasedb(&self.rt, self.inner.fetch_recent_with_limit(limit))
    }

    pub fn schema_version(&self) -> Result<i64, LeasedbError> {
        block_on_leasedb(&self.rt, self.inner.schema_version())
    }

    pub fn lease_metrics(&self) -> LeaseCounters {
        self.inner.lease_metrics()
    }

    pub fn startup_migration(&self) -> &MigrationReport {
        self.inner.startup_migration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::runtime::Runtime;

    #[test]
    fn sync_bridge_covers_the_write_and_read_paths() {
        let rt = Runtime::new().expect("runtime");
        let dir = tempdir().expect("tempdir");
        let sync = LeasedbSync::open(
            LeasedbConfig::development(),
            dir.path().join("app.db"),
            rt.handle().clone(),
        )
        .expect("open");

        assert_eq!(sync.schema_version().expect("version"), 1);
        assert!(sync.startup_migration().was_fresh);

        let receipt = sync.insert_record(41).expect("insert");
        assert_eq!(receipt.record_id, 1);
        sync.insert_record(42).expect("insert");

        let recent = sync.fetch_recent_with_limit(1).expect("fetch");
        assert_eq!(recent.records.len(), 1);
        assert_eq!(recent.records[0].value, 42);

        let counters = sync.lease_metrics();
        assert_eq!(counters.acquires, counters.releases);
        assert_eq!(counters.acquires, 3);
    }
}
