use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Closed set of labels the sequence classifier can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLabel {
    Downstairs,
    Running,
    Standing,
    Upstairs,
    Walking,
    Unknown,
}

impl ActivityLabel {
    pub const ALL: [ActivityLabel; 6] = [
        ActivityLabel::Downstairs,
        ActivityLabel::Running,
        ActivityLabel::Standing,
        ActivityLabel::Upstairs,
        ActivityLabel::Walking,
        ActivityLabel::Unknown,
    ];

    /// Maps the classifier's output index. Indices outside the trained range are `Unknown`.
    pub fn from_class_index(index: i64) -> Self {
        match index {
            0 => Self::Downstairs,
            1 => Self::Running,
            2 => Self::Standing,
            3 => Self::Upstairs,
            4 => Self::Walking,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Downstairs => "downstairs",
            Self::Running => "running",
            Self::Standing => "standing",
            Self::Upstairs => "upstairs",
            Self::Walking => "walking",
            Self::Unknown => "unknown",
        }
    }

    /// Lenient parse used for stored rows; anything unrecognized becomes `Unknown`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "downstairs" => Self::Downstairs,
            "running" => Self::Running,
            "standing" => Self::Standing,
            "upstairs" => Self::Upstairs,
            "walking" => Self::Walking,
            _ => Self::Unknown,
        }
    }
}

impl Default for ActivityLabel {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for ActivityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted classification. Immutable once appended to a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub processed_at: String,
    pub label: ActivityLabel,
}

impl ActivityRecord {
    pub fn new(processed_at: NaiveDateTime, label: ActivityLabel) -> Self {
        Self {
            processed_at: processed_at.format(TIMESTAMP_FORMAT).to_string(),
            label,
        }
    }

    /// Parses `processed_at`; `None` for malformed rows.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.processed_at)
    }

    pub fn day(&self) -> Option<NaiveDate> {
        self.timestamp().map(|ts| ts.date())
    }

    /// Calendar day as stored in the `day_key` column. Falls back to the
    /// text prefix so rows with a damaged time part still land on their day.
    pub fn day_key(&self) -> String {
        match self.day() {
            Some(day) => day_key(day),
            None => self.processed_at.chars().take(10).collect(),
        }
    }
}

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

pub fn day_key(day: NaiveDate) -> String {
    day.format(DAY_KEY_FORMAT).to_string()
}

pub fn parse_day_key(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DAY_KEY_FORMAT).ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityWithDuration {
    pub label: ActivityLabel,
    pub duration_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySummary {
    pub day_key: String,
    pub weight_kg: u32,
    pub activities: Vec<ActivityWithDuration>,
    pub total_minutes: f64,
    pub total_calories: f64,
}
