use std::path::Path;

use crate::database::ActivityStore;
use crate::models::ActivityRecord;

pub async fn get_day_records(data_dir: &Path, date: Option<String>) -> Result<Vec<ActivityRecord>, String> {
    let day = super::resolve_day(date.as_deref())?;
    let store = super::open_store(data_dir)?;
    store.query(day).map_err(|e| e.to_string())
}

pub async fn get_recent_records(data_dir: &Path, limit: Option<usize>) -> Result<Vec<ActivityRecord>, String> {
    let store = super::open_store(data_dir)?;
    store.recent(limit.unwrap_or(20)).map_err(|e| e.to_string())
}

/// Newest stored record, if it was taken today.
pub async fn get_current_activity(data_dir: &Path) -> Result<Option<ActivityRecord>, String> {
    let store = super::open_store(data_dir)?;
    current_for_today(&store, chrono::Local::now().date_naive())
}

pub(crate) fn current_for_today(
    store: &dyn ActivityStore,
    today: chrono::NaiveDate,
) -> Result<Option<ActivityRecord>, String> {
    let last = store.most_recent().map_err(|e| e.to_string())?;
    Ok(last.filter(|record| record.day() == Some(today)))
}
