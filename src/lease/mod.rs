pub mod backend;

use crate::error::LeasedbError;
use crate::store::{ACQUIRE_WRITE_LEASE, RELEASE_WRITE_LEASE, Store};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

#[derive(Debug, Default)]
pub(crate) struct LeaseTelemetry {
    acquires: AtomicU64,
    acquire_failures: AtomicU64,
    releases: AtomicU64,
    release_failures: AtomicU64,
}

/// Snapshot of the coordinator's monotonic counters. After any sequence of
/// completed write brackets, `acquires == releases` holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeaseCounters {
    pub acquires: u64,
    pub acquire_failures: u64,
    pub releases: u64,
    pub release_failures: u64,
}

/// Issues the reserved lease statements through the store connection. The
/// coordinator holds no durable state; exclusivity comes entirely from the
/// backend resolving the statements.
#[derive(Debug)]
pub struct LeaseCoordinator {
    store: Store,
    telemetry: Arc<LeaseTelemetry>,
}

impl LeaseCoordinator {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            telemetry: Arc::new(LeaseTelemetry::default()),
        }
    }

    /// Requests exclusive write permission for the store's identity. Blocks
    /// or fails according to the backend's contention policy; every failure
    /// surfaces as `LeaseUnavailable` and is never retried here.
    pub async fn acquire(&self) -> Result<LeaseGuard, LeasedbError> {
        match self.store.admin(ACQUIRE_WRITE_LEASE).await {
            Ok(()) => {
                self.telemetry.acquires.fetch_add(1, Ordering::Relaxed);
                Ok(LeaseGuard {
                    store: self.store.clone(),
                    telemetry: Arc::clone(&self.telemetry),
                    armed: true,
                })
            }
            Err(err) => {
                self.telemetry.acquire_failures.fetch_add(1, Ordering::Relaxed);
                Err(match err {
                    err @ LeasedbError::LeaseUnavailable(_) => err,
                    other => LeasedbError::LeaseUnavailable(other.to_string()),
                })
            }
        }
    }

    pub fn counters(&self) -> LeaseCounters {
        LeaseCounters {
            acquires: self.telemetry.acquires.load(Ordering::Relaxed),
            acquire_failures: self.telemetry.acquire_failures.load(Ordering::Relaxed),
            releases: self.telemetry.releases.load(Ordering::Relaxed),
            release_failures: self.telemetry.release_failures.load(Ordering::Relaxed),
        }
    }
}

/// Holds the write lease between acquire and release.
///
/// Normal paths consume the guard through [`LeaseGuard::release`] so a
/// failed release can surface to the caller. Dropping an armed guard (work
/// panicked inside the bracket) releases best-effort and logs instead.
#[derive(Debug)]
pub struct LeaseGuard {
    store: Store,
    telemetry: Arc<LeaseTelemetry>,
    armed: bool,
}

impl LeaseGuard {
    pub async fn release(mut self) -> Result<(), LeasedbError> {
        self.armed = false;
        match self.store.admin(RELEASE_WRITE_LEASE).await {
            Ok(()) => {
                self.telemetry.releases.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                self.telemetry.release_failures.fetch_add(1, Ordering::Relaxed);
                Err(match err {
                    err @ LeasedbError::ReleaseFailed(_) => err,
                    other => LeasedbError::ReleaseFailed(other.to_string()),
                })
            }
        }
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.store.release_blocking() {
            Ok(()) => {
                self.telemetry.releases.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.telemetry.release_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    identity = %self.store.identity(),
                    error = %err,
                    "write lease release failed during guard teardown"
                );
            }
        }
    }
}
