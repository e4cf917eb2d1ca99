use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::models::SensorEvent;
use crate::services::activity_pipeline::ActivityPipeline;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub accepted: usize,
    pub rejected: usize,
}

/// Handles one NDJSON line. Bad bytes and bad JSON are counted and skipped.
pub fn ingest_line(pipeline: &ActivityPipeline, line: &[u8], stats: &mut FeedStats) {
    if line.iter().all(u8::is_ascii_whitespace) {
        return;
    }

    match serde_json::from_slice::<SensorEvent>(line) {
        Ok(event) => {
            pipeline.push(event.sensor, event.sample());
            stats.accepted += 1;
        }
        Err(e) => {
            stats.rejected += 1;
            log::warn!("Skipping malformed sensor line: {}", e);
        }
    }
}

/// Reads newline-delimited sensor events until EOF. Only a failing reader
/// ends the feed early.
pub async fn ingest<R>(pipeline: &ActivityPipeline, mut reader: R) -> std::io::Result<FeedStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = FeedStats::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        ingest_line(pipeline, &buf, &mut stats);
    }
    Ok(stats)
}
