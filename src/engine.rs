use crate::error::LeasedbError;
use rusqlite::Connection;
use std::sync::OnceLock;
use tracing::debug;

/// Oldest engine build the crate accepts. `PRAGMA user_version` is ancient,
/// but WAL support and the busy-handler behavior we rely on are not.
const MIN_ENGINE_VERSION: i32 = 3_024_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineInfo {
    pub version: &'static str,
    pub version_number: i32,
}

static ENGINE_INFO: OnceLock<EngineInfo> = OnceLock::new();

/// One-time engine preflight. Runs exactly once per process no matter how
/// many stores are opened afterwards; later callers get the cached result.
///
/// A scratch in-memory connection verifies the linked engine build: version
/// floor and a working `user_version` cell (the migration engine's whole
/// state lives in that cell, so a build that cannot round-trip it is
/// unusable).
pub fn initialize() -> Result<EngineInfo, LeasedbError> {
    if let Some(info) = ENGINE_INFO.get() {
        return Ok(*info);
    }

    let version_number = rusqlite::version_number();
    if version_number < MIN_ENGINE_VERSION {
        return Err(LeasedbError::EngineInit(format!(
            "engine build {} is older than required {MIN_ENGINE_VERSION}",
            rusqlite::version()
        )));
    }

    let probe = Connection::open_in_memory()?;
    probe.pragma_update(None, "user_version", 7_i64)?;
    let round_trip: i64 = probe.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if round_trip != 7 {
        return Err(LeasedbError::EngineInit(format!(
            "user_version cell does not round-trip (wrote 7, read {round_trip})"
        )));
    }
    drop(probe);

    let info = EngineInfo {
        version: rusqlite::version(),
        version_number,
    };
    debug!(
        version = info.version,
        version_number = info.version_number,
        "engine preflight complete"
    );
    Ok(*ENGINE_INFO.get_or_init(|| info))
}
