use serde::{Deserialize, Serialize};

pub const DEFAULT_WEIGHT_KG: u32 = 70;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub version: String,
    #[serde(default)]
    pub profile: ProfileSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            profile: ProfileSettings::default(),
            pipeline: PipelineSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSettings {
    #[serde(default = "default_weight_kg")]
    pub weight_kg: u32,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            weight_kg: DEFAULT_WEIGHT_KG,
        }
    }
}

fn default_weight_kg() -> u32 {
    DEFAULT_WEIGHT_KG
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Samples per sensor in one model window.
    pub window_size: usize,
    /// Minimum spacing between inference pass starts.
    pub sample_interval_ms: i64,
    /// Consecutive identical raw labels required before a label is trusted.
    pub confidence_threshold: usize,
    /// Minimum gap before an unchanged label is persisted again.
    pub record_cooldown_ms: i64,
    /// Upper bound on a single classifier call.
    #[serde(default = "default_inference_timeout_ms")]
    pub inference_timeout_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            window_size: 50,
            sample_interval_ms: 500,
            confidence_threshold: 3,
            record_cooldown_ms: 30_000,
            inference_timeout_ms: default_inference_timeout_ms(),
        }
    }
}

fn default_inference_timeout_ms() -> u64 {
    2_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub retention_days: i64,
    pub auto_cleanup: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            retention_days: 365,
            auto_cleanup: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_constants() {
        let settings = Settings::default();
        assert_eq!(settings.profile.weight_kg, 70);
        assert_eq!(settings.pipeline.window_size, 50);
        assert_eq!(settings.pipeline.sample_interval_ms, 500);
        assert_eq!(settings.pipeline.confidence_threshold, 3);
        assert_eq!(settings.pipeline.record_cooldown_ms, 30_000);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"version":"1.0.0"}"#).unwrap();
        assert_eq!(settings.profile.weight_kg, 70);
        assert_eq!(settings.pipeline.inference_timeout_ms, 2_000);
        assert!(settings.storage.auto_cleanup);
    }
}
