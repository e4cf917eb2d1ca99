use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageStats {
    pub total_size_bytes: i64,
    pub records_count: i64,
    pub days_count: i64,
    pub oldest_record: Option<String>,
    pub newest_record: Option<String>,
}
