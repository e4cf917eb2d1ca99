use chrono::{NaiveDate, NaiveDateTime};

use crate::database::{ActivityStore, StoreError};
use crate::models::{ActivityLabel, ActivityRecord};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecorderState {
    pub last_label: Option<ActivityLabel>,
    pub last_recorded_at_ms: i64,
    pub last_recorded_day: Option<NaiveDate>,
}

#[derive(Debug)]
pub enum RecordDecision {
    Recorded(ActivityRecord),
    /// Same label as last time and still inside the cooldown.
    Skipped { elapsed_ms: i64 },
    /// Append failed; state was left untouched so the next confident label retries.
    Failed(StoreError),
}

impl RecordDecision {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

/// Persists confident labels: always on a label change, otherwise at most
/// once per cooldown.
#[derive(Debug, Clone)]
pub struct ActivityRecorder {
    cooldown_ms: i64,
    state: RecorderState,
}

impl ActivityRecorder {
    pub fn new(cooldown_ms: i64) -> Self {
        Self {
            cooldown_ms,
            state: RecorderState::default(),
        }
    }

    pub fn state(&self) -> &RecorderState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = RecorderState::default();
    }

    /// Seeds state from the store's newest record when it belongs to today,
    /// so a restart does not immediately duplicate the last record.
    pub fn restore(&mut self, last: Option<&ActivityRecord>, local_now: NaiveDateTime, now_ms: i64) {
        let Some(record) = last else {
            return;
        };
        let Some(recorded_at) = record.timestamp() else {
            log::warn!("Ignoring unparsable last record timestamp {:?}", record.processed_at);
            return;
        };
        if recorded_at.date() != local_now.date() {
            log::debug!("Last record is from {}, starting the day fresh", recorded_at.date());
            return;
        }

        let age_ms = (local_now - recorded_at).num_milliseconds().max(0);
        self.state = RecorderState {
            last_label: Some(record.label),
            last_recorded_at_ms: now_ms - age_ms,
            last_recorded_day: Some(recorded_at.date()),
        };
    }

    pub fn should_record(&self, label: ActivityLabel, now_ms: i64) -> bool {
        self.state.last_label != Some(label) || now_ms - self.state.last_recorded_at_ms >= self.cooldown_ms
    }

    pub fn on_confident(
        &mut self,
        label: ActivityLabel,
        now_ms: i64,
        local_now: NaiveDateTime,
        store: &dyn ActivityStore,
    ) -> RecordDecision {
        let today = local_now.date();
        if self.state.last_recorded_day.is_some_and(|day| day != today) {
            log::info!("New day {}, resetting recorder state", today);
            self.reset();
        }

        if !self.should_record(label, now_ms) {
            let elapsed_ms = now_ms - self.state.last_recorded_at_ms;
            log::debug!("Skipping {} - recorded {}ms ago", label, elapsed_ms);
            return RecordDecision::Skipped { elapsed_ms };
        }

        let record = ActivityRecord::new(local_now, label);
        match store.append(&record) {
            Ok(()) => {
                let changed = self.state.last_label != Some(label);
                self.state = RecorderState {
                    last_label: Some(label),
                    last_recorded_at_ms: now_ms,
                    last_recorded_day: Some(today),
                };
                log::info!("Recorded {} at {} (changed: {})", label, record.processed_at, changed);
                RecordDecision::Recorded(record)
            }
            Err(e) => {
                log::error!("Failed to store activity {}: {}", label, e);
                RecordDecision::Failed(e)
            }
        }
    }
}
