use std::path::Path;

use chrono::NaiveDate;

use crate::database::ActivityStore;
use crate::models::{day_key, DailySummary};
use crate::services::{calorie_estimator, duration_aggregator};

/// Durations and calories for one day, recomputed from the stored records.
pub fn build_daily_summary(
    store: &dyn ActivityStore,
    day: NaiveDate,
    weight_kg: u32,
) -> Result<DailySummary, String> {
    let records = store.query(day).map_err(|e| e.to_string())?;
    let report = duration_aggregator::aggregate(&records);
    if report.fallback_intervals > 0 {
        log::warn!("{}: {} interval(s) used the default credit", day, report.fallback_intervals);
    }

    let total_minutes = report.total_minutes();
    let total_calories = calorie_estimator::total_calories(weight_kg, &report.activities);

    Ok(DailySummary {
        day_key: day_key(day),
        weight_kg,
        activities: report.activities,
        total_minutes,
        total_calories,
    })
}

pub async fn get_daily_summary(data_dir: &Path, date: Option<String>) -> Result<DailySummary, String> {
    let day = super::resolve_day(date.as_deref())?;
    let settings = crate::utils::config::load_settings(data_dir)?;
    let store = super::open_store(data_dir)?;
    build_daily_summary(&store, day, settings.profile.weight_kg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryActivityStore;
    use crate::models::{ActivityLabel, ActivityRecord};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    #[test]
    fn summary_combines_durations_and_calories() {
        let store = MemoryActivityStore::new();
        let start = day().and_hms_opt(7, 0, 0).unwrap();
        store.append(&ActivityRecord::new(start, ActivityLabel::Running)).unwrap();
        store
            .append(&ActivityRecord::new(start + chrono::TimeDelta::minutes(30), ActivityLabel::Standing))
            .unwrap();

        let summary = build_daily_summary(&store, day(), 70).unwrap();
        assert_eq!(summary.day_key, "2024-06-10");
        assert_eq!(summary.activities.len(), 2);
        assert_eq!(summary.activities[0].duration_minutes, 30.0);
        let standing_kcal = calorie_estimator::calories(70, "standing", 0.16667);
        assert!((summary.total_calories - (280.0 + standing_kcal)).abs() < 1e-9);
        assert!((summary.total_minutes - 30.16667).abs() < 1e-9);
    }

    #[test]
    fn empty_day_is_zero() {
        let store = MemoryActivityStore::new();
        let summary = build_daily_summary(&store, day(), 70).unwrap();
        assert!(summary.activities.is_empty());
        assert_eq!(summary.total_calories, 0.0);
    }
}
