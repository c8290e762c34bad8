use crate::error::LeasedbError;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One row of the `data` table as collaborators see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub value: i64,
}

/// Result of a leased insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertReceipt {
    pub record_id: i64,
    /// Wall time of the whole bracket, lease wait included.
    pub latency: Duration,
}

/// Result of a recent-window read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentRecords {
    pub records: Vec<Record>,
    pub latency: Duration,
}

pub fn insert_value(conn: &Connection, value: i64) -> Result<i64, LeasedbError> {
    conn.execute("INSERT INTO data (data) VALUES (?1)", [value])?;
    Ok(conn.last_insert_rowid())
}

/// Returns the newest `limit` records in ascending id order. The inner
/// query selects the window from the tail, the outer one restores the
/// order collaborators expect.
pub fn recent(conn: &Connection, limit: usize) -> Result<Vec<Record>, LeasedbError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM (SELECT * FROM data ORDER BY id DESC LIMIT ?1) ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([limit as i64], |row| {
        Ok(Record {
            id: row.get(0)?,
            value: row.get(1)?,
        })
    })?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}
