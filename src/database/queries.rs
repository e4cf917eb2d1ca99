use rusqlite::{Connection, OptionalExtension, Row};

use crate::models::{ActivityLabel, ActivityRecord};

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ActivityRecord> {
    let processed_at: String = row.get(0)?;
    let label: String = row.get(1)?;
    Ok(ActivityRecord {
        processed_at,
        label: ActivityLabel::parse(&label),
    })
}

pub fn insert_prediction(
    conn: &Connection,
    record: &ActivityRecord,
    recorded_at_ms: i64,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO activity_predictions (processed_at, day_key, label, recorded_at_ms)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            &record.processed_at,
            record.day_key(),
            record.label.as_str(),
            recorded_at_ms,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Rows for one calendar day by timestamp, append order breaking ties.
pub fn get_predictions_by_day(conn: &Connection, day_key: &str) -> rusqlite::Result<Vec<ActivityRecord>> {
    let mut stmt = conn.prepare(
        "SELECT processed_at, label
         FROM activity_predictions
         WHERE day_key = ?1
         ORDER BY processed_at ASC, id ASC",
    )?;

    let records = stmt
        .query_map([day_key], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

pub fn get_most_recent_prediction(conn: &Connection) -> rusqlite::Result<Option<ActivityRecord>> {
    conn.query_row(
        "SELECT processed_at, label
         FROM activity_predictions
         ORDER BY id DESC
         LIMIT 1",
        [],
        record_from_row,
    )
    .optional()
}

/// Newest first.
pub fn get_recent_predictions(conn: &Connection, limit: usize) -> rusqlite::Result<Vec<ActivityRecord>> {
    let mut stmt = conn.prepare(
        "SELECT processed_at, label
         FROM activity_predictions
         ORDER BY id DESC
         LIMIT ?1",
    )?;

    let records = stmt
        .query_map([limit as i64], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

pub fn delete_predictions_by_day(conn: &Connection, day_key: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM activity_predictions WHERE day_key = ?1", [day_key])
}

/// Removes every day strictly before `cutoff_day_key`.
pub fn delete_predictions_before(conn: &Connection, cutoff_day_key: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM activity_predictions WHERE day_key < ?1",
        [cutoff_day_key],
    )
}

pub struct PredictionCounts {
    pub records: i64,
    pub days: i64,
    pub oldest: Option<String>,
    pub newest: Option<String>,
}

pub fn get_prediction_counts(conn: &Connection) -> rusqlite::Result<PredictionCounts> {
    conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT day_key), MIN(processed_at), MAX(processed_at)
         FROM activity_predictions",
        [],
        |row| {
            Ok(PredictionCounts {
                records: row.get(0)?,
                days: row.get(1)?,
                oldest: row.get(2)?,
                newest: row.get(3)?,
            })
        },
    )
}
