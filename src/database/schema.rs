use anyhow::Result;
use rusqlite::Connection;

pub fn create_tables(conn: &Connection) -> Result<()> {
    // One row per persisted confident classification
    conn.execute(
        "CREATE TABLE IF NOT EXISTS activity_predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            processed_at TEXT NOT NULL,
            day_key TEXT NOT NULL,
            label TEXT NOT NULL,
            recorded_at_ms INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_activity_predictions_day_key
         ON activity_predictions(day_key, processed_at)",
        [],
    )?;

    Ok(())
}
