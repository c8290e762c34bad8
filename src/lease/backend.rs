use crate::config::LeaseContention;
use crate::error::LeasedbError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Backend that resolves the reserved lease statements for a store.
///
/// `Engine` forwards them verbatim to the storage engine connection, where a
/// lease-aware engine build resolves them against its external lease
/// service (plain builds treat unknown pragmas as no-ops). `InProcess`
/// resolves them locally; stores opened against a shared handle contend
/// with each other, which is how multi-process deployments are simulated.
#[derive(Clone, Debug)]
pub enum LeaseService {
    Engine,
    InProcess(InProcessLease),
}

#[derive(Debug)]
struct LeaseSlot {
    held: Mutex<bool>,
    freed: Notify,
}

impl LeaseSlot {
    fn new() -> Self {
        Self {
            held: Mutex::new(false),
            freed: Notify::new(),
        }
    }
}

#[derive(Debug, Default)]
struct LeaseRegistry {
    slots: Mutex<HashMap<String, Arc<LeaseSlot>>>,
}

/// Process-local lease backend keyed by database identity.
///
/// Exclusivity holds per identity: one holder at a time, second acquirers
/// wait or fail per the requested contention policy. Cloning shares the
/// registry, so every store constructed from the same handle sees the same
/// holders.
#[derive(Clone, Debug, Default)]
pub struct InProcessLease {
    registry: Arc<LeaseRegistry>,
}

impl InProcessLease {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, identity: &str) -> Arc<LeaseSlot> {
        let mut slots = self.registry.slots.lock();
        Arc::clone(
            slots
                .entry(identity.to_string())
                .or_insert_with(|| Arc::new(LeaseSlot::new())),
        )
    }

    pub async fn acquire(
        &self,
        identity: &str,
        contention: LeaseContention,
        timeout: Option<Duration>,
    ) -> Result<(), LeasedbError> {
        let slot = self.slot(identity);
        match contention {
            LeaseContention::FailFast => {
                let mut held = slot.held.lock();
                if *held {
                    return Err(LeasedbError::LeaseUnavailable(format!(
                        "write lease for {identity} is held"
                    )));
                }
                *held = true;
                Ok(())
            }
            LeaseContention::Block => {
                let deadline = timeout.map(|t| tokio::time::Instant::now() + t);
                loop {
                    // Register for the wakeup before checking, so a release
                    // between the check and the await cannot be missed.
                    let freed = slot.freed.notified();
                    tokio::pin!(freed);
                    freed.as_mut().enable();
                    {
                        let mut held = slot.held.lock();
                        if !*held {
                            *held = true;
                            return Ok(());
                        }
                    }
                    match deadline {
                        Some(deadline) => {
                            if tokio::time::timeout_at(deadline, freed).await.is_err() {
                                return Err(LeasedbError::LeaseUnavailable(format!(
                                    "timed out waiting for write lease on {identity}"
                                )));
                            }
                        }
                        None => freed.await,
                    }
                }
            }
        }
    }

    /// Releases the lease for `identity`. Releasing without a holder is a
    /// caller error and is rejected rather than absorbed, since it would
    /// otherwise hide a broken acquire/release pairing.
    pub fn release(&self, identity: &str) -> Result<(), LeasedbError> {
        let slot = self.slot(identity);
        {
            let mut held = slot.held.lock();
            if !*held {
                return Err(LeasedbError::ReleaseFailed(format!(
                    "no write lease held for {identity}"
                )));
            }
            *held = false;
        }
        slot.freed.notify_waiters();
        Ok(())
    }

    pub fn is_held(&self, identity: &str) -> bool {
        *self.slot(identity).held.lock()
    }
}
