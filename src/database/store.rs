use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::Connection;

use super::{queries, ActivityStore, StoreError};
use crate::models::{day_key, ActivityRecord, StorageStats};

/// SQLite-backed store. One connection behind a mutex serializes every
/// read and write, so appends and day queries never interleave.
pub struct SqliteActivityStore {
    conn: Mutex<Connection>,
}

impl SqliteActivityStore {
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        let conn = super::init_database(db_path)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<ActivityRecord>, StoreError> {
        let conn = self.lock()?;
        Ok(queries::get_recent_predictions(&conn, limit)?)
    }

    /// Deletes days older than `retention_days` before `today`.
    pub fn cleanup_older_than(&self, today: NaiveDate, retention_days: i64) -> Result<usize, StoreError> {
        let cutoff = today - chrono::TimeDelta::days(retention_days.max(0));
        let conn = self.lock()?;
        Ok(queries::delete_predictions_before(&conn, &day_key(cutoff))?)
    }

    pub fn stats(&self, db_path: &Path) -> Result<StorageStats, StoreError> {
        let conn = self.lock()?;
        let counts = queries::get_prediction_counts(&conn)?;
        let total_size_bytes = db_path.metadata().map(|m| m.len() as i64).unwrap_or(0);

        Ok(StorageStats {
            total_size_bytes,
            records_count: counts.records,
            days_count: counts.days,
            oldest_record: counts.oldest,
            newest_record: counts.newest,
        })
    }
}

impl ActivityStore for SqliteActivityStore {
    fn append(&self, record: &ActivityRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let recorded_at_ms = chrono::Utc::now().timestamp_millis();
        queries::insert_prediction(&conn, record, recorded_at_ms)?;
        Ok(())
    }

    fn query(&self, day: NaiveDate) -> Result<Vec<ActivityRecord>, StoreError> {
        let conn = self.lock()?;
        Ok(queries::get_predictions_by_day(&conn, &day_key(day))?)
    }

    fn clear(&self, day: NaiveDate) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        Ok(queries::delete_predictions_by_day(&conn, &day_key(day))?)
    }

    fn most_recent(&self) -> Result<Option<ActivityRecord>, StoreError> {
        let conn = self.lock()?;
        Ok(queries::get_most_recent_prediction(&conn)?)
    }
}

/// Process-local store with the same contract; nothing survives a restart.
#[derive(Default)]
pub struct MemoryActivityStore {
    records: Mutex<Vec<ActivityRecord>>,
}

impl MemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> Vec<ActivityRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ActivityStore for MemoryActivityStore {
    fn append(&self, record: &ActivityRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        records.push(record.clone());
        Ok(())
    }

    fn query(&self, day: NaiveDate) -> Result<Vec<ActivityRecord>, StoreError> {
        let key = day_key(day);
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        let mut day: Vec<_> = records.iter().filter(|r| r.day_key() == key).cloned().collect();
        day.sort_by(|a, b| a.processed_at.cmp(&b.processed_at));
        Ok(day)
    }

    fn clear(&self, day: NaiveDate) -> Result<usize, StoreError> {
        let key = day_key(day);
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        let before = records.len();
        records.retain(|r| r.day_key() != key);
        Ok(before - records.len())
    }

    fn most_recent(&self) -> Result<Option<ActivityRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.last().cloned())
    }
}
