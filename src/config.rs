use std::time::Duration;

/// Behavior of a lease acquisition that finds the lease already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseContention {
    /// Wait until the holder releases, bounded by the configured timeout.
    Block,
    /// Return `LeaseUnavailable` immediately.
    FailFast,
}

/// Which backend resolves the reserved lease statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseRoute {
    /// Forward the statements verbatim to the storage engine; a lease-aware
    /// engine build resolves them against its external lease service.
    Engine,
    /// Resolve them against a process-local backend. Stores opened with a
    /// shared backend handle contend with each other.
    InProcess,
}

/// Runtime configuration for a leasedb instance.
#[derive(Debug, Clone)]
pub struct LeasedbConfig {
    pub lease_route: LeaseRoute,
    pub lease_contention: LeaseContention,
    /// Upper bound on a blocking acquisition. `None` waits indefinitely.
    pub lease_acquire_timeout_ms: Option<u64>,
    pub busy_timeout_ms: u64,
    /// Row window served by `fetch_recent` at the collaborator surface.
    pub fetch_window: usize,
}

impl Default for LeasedbConfig {
    fn default() -> Self {
        Self {
            lease_route: LeaseRoute::InProcess,
            lease_contention: LeaseContention::Block,
            lease_acquire_timeout_ms: Some(30_000),
            busy_timeout_ms: 5_000,
            fetch_window: 20,
        }
    }
}

impl LeasedbConfig {
    pub fn production() -> Self {
        Self {
            lease_route: LeaseRoute::Engine,
            ..Self::default()
        }
    }

    pub fn development() -> Self {
        Self {
            lease_route: LeaseRoute::InProcess,
            lease_acquire_timeout_ms: Some(5_000),
            ..Self::default()
        }
    }

    /// Profile for callers that prefer an immediate `LeaseUnavailable` over
    /// queueing behind the current holder.
    pub fn fail_fast() -> Self {
        Self {
            lease_contention: LeaseContention::FailFast,
            lease_acquire_timeout_ms: None,
            ..Self::default()
        }
    }

    pub fn lease_acquire_timeout(&self) -> Option<Duration> {
        self.lease_acquire_timeout_ms.map(Duration::from_millis)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
