use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::path::Path;

use crate::models::ActivityRecord;

pub mod queries;
pub mod schema;
pub mod store;

pub use store::{MemoryActivityStore, SqliteActivityStore};

pub const DATABASE_FILE: &str = "pacemeter.db";

pub fn init_database(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;

    // Enable WAL mode
    conn.pragma_update(None, "journal_mode", &"WAL")?;
    conn.pragma_update(None, "synchronous", &"NORMAL")?;

    // Create schema
    schema::create_tables(&conn)?;

    Ok(conn)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only, day-addressable record store behind the recorder and the aggregator.
pub trait ActivityStore: Send + Sync {
    fn append(&self, record: &ActivityRecord) -> Result<(), StoreError>;

    /// Records of one calendar day ordered by timestamp, append order breaking ties.
    fn query(&self, day: NaiveDate) -> Result<Vec<ActivityRecord>, StoreError>;

    fn clear(&self, day: NaiveDate) -> Result<usize, StoreError>;

    fn most_recent(&self) -> Result<Option<ActivityRecord>, StoreError>;
}
