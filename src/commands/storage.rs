use std::path::Path;

use crate::database::{ActivityStore, DATABASE_FILE};
use crate::models::StorageStats;

pub async fn get_storage_stats(data_dir: &Path) -> Result<StorageStats, String> {
    let store = super::open_store(data_dir)?;
    store.stats(&data_dir.join(DATABASE_FILE)).map_err(|e| e.to_string())
}

pub async fn clear_day(data_dir: &Path, date: Option<String>) -> Result<usize, String> {
    let day = super::resolve_day(date.as_deref())?;
    let store = super::open_store(data_dir)?;
    let removed = store.clear(day).map_err(|e| e.to_string())?;
    log::info!("Cleared {} record(s) for {}", removed, day);
    Ok(removed)
}

pub async fn cleanup_old_data(data_dir: &Path, retention_days: i64) -> Result<usize, String> {
    let store = super::open_store(data_dir)?;
    let today = chrono::Local::now().date_naive();
    let deleted = store
        .cleanup_older_than(today, retention_days)
        .map_err(|e| e.to_string())?;
    if deleted > 0 {
        log::info!("Removed {} record(s) older than {} days", deleted, retention_days);
    }
    Ok(deleted)
}
