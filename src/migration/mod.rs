use crate::error::LeasedbError;
use rusqlite::Connection;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One schema step. `sql` runs as a batch inside the shared replay
/// transaction, so a step may contain several statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub label: String,
    pub sql: String,
}

impl Migration {
    pub fn new(label: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sql: sql.into(),
        }
    }
}

/// Ordered schema history. Index equals schema version; index 0 is a
/// placeholder that is never executed, so a fresh store at version 0
/// replays from index 1.
#[derive(Debug, Clone)]
pub struct MigrationSet {
    steps: Vec<Migration>,
}

impl MigrationSet {
    pub fn from_steps(steps: Vec<Migration>) -> Self {
        let mut all = Vec::with_capacity(steps.len() + 1);
        all.push(Migration::new("baseline", ""));
        all.extend(steps);
        Self { steps: all }
    }

    /// The version a fully migrated store reports.
    pub fn terminal_version(&self) -> i64 {
        self.steps.len() as i64 - 1
    }

    fn step(&self, index: i64) -> &Migration {
        &self.steps[index as usize]
    }
}

/// The schema history this crate ships with.
pub fn builtin_migrations() -> MigrationSet {
    MigrationSet::from_steps(vec![Migration::new(
        "create data table",
        "CREATE TABLE data (id INTEGER PRIMARY KEY AUTOINCREMENT, data INTEGER)",
    )])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub index: i64,
    pub label: String,
    pub elapsed: Duration,
}

/// Outcome of one replay pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// The store was at version 0 when the pass started.
    pub was_fresh: bool,
    /// Steps executed by this pass, in order. Empty when the store was
    /// already at the terminal version.
    pub applied: Vec<AppliedMigration>,
    /// Persisted schema version after the pass.
    pub version: i64,
}

/// Reads the persisted schema version from the store.
pub fn current_version(conn: &Connection) -> Result<i64, LeasedbError> {
    let version = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

/// Replays every pending step in one transaction and bumps the persisted
/// version to the terminal one inside that same transaction, so a store is
/// only ever observed fully behind or fully caught up.
///
/// A store whose persisted version exceeds the terminal version was written
/// by a newer schema history and is rejected with `SchemaAhead` before any
/// statement runs.
pub fn run(conn: &mut Connection, set: &MigrationSet) -> Result<MigrationReport, LeasedbError> {
    let terminal = set.terminal_version();
    let tx = conn.transaction()?;
    let started = current_version(&tx)?;

    if started > terminal {
        return Err(LeasedbError::SchemaAhead {
            persisted: started,
            known: terminal,
        });
    }
    if started == terminal {
        debug!(version = started, "schema already at terminal version");
        return Ok(MigrationReport {
            was_fresh: started == 0,
            applied: Vec::new(),
            version: started,
        });
    }

    let mut applied = Vec::with_capacity((terminal - started) as usize);
    for index in (started + 1)..=terminal {
        let step = set.step(index);
        let step_started = Instant::now();
        tx.execute_batch(&step.sql)
            .map_err(|e| LeasedbError::MigrationFailed {
                index,
                reason: e.to_string(),
            })?;
        let elapsed = step_started.elapsed();
        debug!(index, label = %step.label, ?elapsed, "applied migration");
        applied.push(AppliedMigration {
            index,
            label: step.label.clone(),
            elapsed,
        });
    }
    tx.pragma_update(None, "user_version", terminal)?;
    tx.commit()?;

    info!(
        from = started,
        to = terminal,
        steps = applied.len(),
        "schema migrated"
    );
    Ok(MigrationReport {
        was_fresh: started == 0,
        applied,
        version: terminal,
    })
}
