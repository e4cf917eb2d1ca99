use std::path::{Path, PathBuf};

use crate::models::{Settings, DEFAULT_WEIGHT_KG};

const ENV_WEIGHT_KG: &str = "PACEMETER_WEIGHT_KG";
const ENV_DATA_DIR: &str = "PACEMETER_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "pacemeter-data";

pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

pub fn data_dir() -> PathBuf {
    std::env::var(ENV_DATA_DIR)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config").join("settings.json")
}

/// Body weight from free text. Integer or decimal input is accepted, the
/// fractional part is dropped; anything else falls back to the default.
pub fn parse_weight_kg(raw: &str) -> u32 {
    match raw.trim().parse::<f32>() {
        Ok(kg) if kg.is_finite() && kg >= 1.0 => kg as u32,
        _ => {
            log::warn!("Unusable weight {:?}, using {} kg", raw, DEFAULT_WEIGHT_KG);
            DEFAULT_WEIGHT_KG
        }
    }
}

pub fn weight_from_env() -> Option<u32> {
    std::env::var(ENV_WEIGHT_KG)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|v| parse_weight_kg(&v))
}

pub fn apply_env_defaults(settings: &mut Settings) {
    if let Some(weight) = weight_from_env() {
        settings.profile.weight_kg = weight;
    }
    if settings.profile.weight_kg == 0 {
        settings.profile.weight_kg = DEFAULT_WEIGHT_KG;
    }
}

pub fn load_settings(data_dir: &Path) -> Result<Settings, String> {
    let config_path = settings_path(data_dir);
    let mut settings = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path).map_err(|e| e.to_string())?;
        serde_json::from_str::<Settings>(&content).map_err(|e| e.to_string())?
    } else {
        Settings::default()
    };
    apply_env_defaults(&mut settings);
    Ok(settings)
}

pub fn save_settings(data_dir: &Path, settings: &Settings) -> Result<(), String> {
    let config_path = settings_path(data_dir);
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let content = serde_json::to_string_pretty(settings).map_err(|e| e.to_string())?;
    std::fs::write(&config_path, content).map_err(|e| e.to_string())
}
