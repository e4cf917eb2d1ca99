use std::path::Path;

use crate::models::Settings;
use crate::utils::config;

pub async fn get_settings(data_dir: &Path) -> Result<Settings, String> {
    config::load_settings(data_dir)
}

/// Stores a new body weight. Unusable input falls back to the default weight.
pub async fn update_weight(data_dir: &Path, raw: &str) -> Result<Settings, String> {
    let mut settings = config::load_settings(data_dir)?;
    settings.profile.weight_kg = config::parse_weight_kg(raw);
    config::save_settings(data_dir, &settings)?;
    Ok(settings)
}
