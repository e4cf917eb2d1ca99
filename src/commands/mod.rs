use std::path::Path;

use chrono::NaiveDate;

use crate::database::{SqliteActivityStore, DATABASE_FILE};
use crate::models::parse_day_key;

pub mod activity;
pub mod settings;
pub mod storage;
pub mod summary;

pub(crate) fn open_store(data_dir: &Path) -> Result<SqliteActivityStore, String> {
    std::fs::create_dir_all(data_dir).map_err(|e| e.to_string())?;
    SqliteActivityStore::open(&data_dir.join(DATABASE_FILE)).map_err(|e| e.to_string())
}

/// `YYYY-MM-DD`, or today's local date when absent.
pub(crate) fn resolve_day(date: Option<&str>) -> Result<NaiveDate, String> {
    match date {
        Some(raw) => parse_day_key(raw).ok_or_else(|| format!("Invalid date {:?}, expected YYYY-MM-DD", raw)),
        None => Ok(chrono::Local::now().date_naive()),
    }
}
