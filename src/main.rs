use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tokio::io::BufReader;

use pacemeter::commands;
use pacemeter::database::{SqliteActivityStore, DATABASE_FILE};
use pacemeter::services::{sensor_feed, ActivityPipeline, HeuristicClassifier, PipelineConfig};
use pacemeter::utils::{config, SystemClock};

const USAGE: &str = "usage: pacemeter <run | summary [date] | records [date] | recent [n] | current | clear [date] | stats | settings [weight <kg>]>";

#[tokio::main]
async fn main() -> Result<()> {
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let data_dir = config::data_dir();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("run");
    let arg = args.get(1).cloned();

    match command {
        "run" => run(&data_dir).await?,
        "summary" => print_json(&commands::summary::get_daily_summary(&data_dir, arg).await.map_err(anyhow::Error::msg)?)?,
        "records" => print_json(&commands::activity::get_day_records(&data_dir, arg).await.map_err(anyhow::Error::msg)?)?,
        "recent" => {
            let limit = match arg.as_deref() {
                Some(raw) => Some(raw.parse::<usize>().with_context(|| format!("Invalid count {:?}", raw))?),
                None => None,
            };
            print_json(&commands::activity::get_recent_records(&data_dir, limit).await.map_err(anyhow::Error::msg)?)?
        }
        "current" => print_json(&commands::activity::get_current_activity(&data_dir).await.map_err(anyhow::Error::msg)?)?,
        "clear" => {
            let removed = commands::storage::clear_day(&data_dir, arg).await.map_err(anyhow::Error::msg)?;
            println!("{}", removed);
        }
        "stats" => print_json(&commands::storage::get_storage_stats(&data_dir).await.map_err(anyhow::Error::msg)?)?,
        "settings" => match (arg.as_deref(), args.get(2)) {
            (None, _) => print_json(&commands::settings::get_settings(&data_dir).await.map_err(anyhow::Error::msg)?)?,
            (Some("weight"), Some(kg)) => {
                let settings = commands::settings::update_weight(&data_dir, kg).await.map_err(anyhow::Error::msg)?;
                print_json(&settings)?;
            }
            _ => bail!(USAGE),
        },
        _ => bail!(USAGE),
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Feeds NDJSON sensor events from stdin through the pipeline until EOF.
async fn run(data_dir: &Path) -> Result<()> {
    let settings = config::load_settings(data_dir).map_err(anyhow::Error::msg)?;
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    if settings.storage.auto_cleanup {
        commands::storage::cleanup_old_data(data_dir, settings.storage.retention_days)
            .await
            .map_err(anyhow::Error::msg)?;
    }

    let store = SqliteActivityStore::open(&data_dir.join(DATABASE_FILE)).context("Failed to initialize database")?;
    let pipeline = ActivityPipeline::new(
        PipelineConfig::from(&settings.pipeline),
        Arc::new(HeuristicClassifier),
        Arc::new(store),
        Arc::new(SystemClock::new()),
    );
    log::info!(
        "Pipeline ready: window {} samples, pass every {}ms, weight {} kg",
        settings.pipeline.window_size,
        settings.pipeline.sample_interval_ms,
        settings.profile.weight_kg
    );

    let mut labels = pipeline.subscribe();
    let watcher = tokio::spawn(async move {
        let mut last = None;
        while labels.changed().await.is_ok() {
            let current = *labels.borrow_and_update();
            if current != last {
                if let Some(label) = current {
                    log::info!("Current activity: {}", label);
                }
                last = current;
            }
        }
    });

    let stats = sensor_feed::ingest(&pipeline, BufReader::new(tokio::io::stdin())).await;

    pipeline.drain().await;
    drop(pipeline);
    if let Err(e) = watcher.await {
        log::warn!("Label watcher ended abnormally: {}", e);
    }

    let stats = stats.context("Failed to read sensor feed")?;
    log::info!("Sensor feed closed: {} events, {} rejected", stats.accepted, stats.rejected);
    Ok(())
}
