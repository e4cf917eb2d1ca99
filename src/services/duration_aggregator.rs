use crate::models::{ActivityLabel, ActivityRecord, ActivityWithDuration};

/// Credit for a record with no usable successor interval (10 s).
pub const DEFAULT_INTERVAL_MINUTES: f64 = 0.16667;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DurationReport {
    /// Per-label totals in order of first appearance.
    pub activities: Vec<ActivityWithDuration>,
    /// Intervals that fell back to the default credit because a timestamp
    /// was unparsable or the pair ran backwards.
    pub fallback_intervals: usize,
}

impl DurationReport {
    pub fn total_minutes(&self) -> f64 {
        self.activities.iter().map(|a| a.duration_minutes).sum()
    }

    pub fn minutes_for(&self, label: ActivityLabel) -> f64 {
        self.activities
            .iter()
            .find(|a| a.label == label)
            .map(|a| a.duration_minutes)
            .unwrap_or(0.0)
    }
}

/// Replays one day's records (in append order) into per-label minutes.
///
/// Record `i` is credited with the gap to record `i + 1`; the final record
/// gets [`DEFAULT_INTERVAL_MINUTES`]. Totals are summed per label across the
/// whole day, not per contiguous session.
pub fn aggregate(records: &[ActivityRecord]) -> DurationReport {
    let mut report = DurationReport::default();

    for (i, record) in records.iter().enumerate() {
        let minutes = match records.get(i + 1) {
            Some(next) => match interval_minutes(record, next) {
                Some(minutes) => minutes,
                None => {
                    log::warn!(
                        "Bad interval {:?} -> {:?}, crediting {} min to {}",
                        record.processed_at,
                        next.processed_at,
                        DEFAULT_INTERVAL_MINUTES,
                        record.label
                    );
                    report.fallback_intervals += 1;
                    DEFAULT_INTERVAL_MINUTES
                }
            },
            None => DEFAULT_INTERVAL_MINUTES,
        };

        match report.activities.iter_mut().find(|a| a.label == record.label) {
            Some(entry) => entry.duration_minutes += minutes,
            None => report.activities.push(ActivityWithDuration {
                label: record.label,
                duration_minutes: minutes,
            }),
        }
    }

    for activity in &report.activities {
        log::debug!("Activity: {}, total duration: {:.3} min", activity.label, activity.duration_minutes);
    }

    report
}

fn interval_minutes(current: &ActivityRecord, next: &ActivityRecord) -> Option<f64> {
    let start = current.timestamp()?;
    let end = next.timestamp()?;
    let millis = (end - start).num_milliseconds();
    if millis < 0 {
        return None;
    }
    Some(millis as f64 / 60_000.0)
}
