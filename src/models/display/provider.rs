//! Provider counter display model

use serde::Serialize;
use tabled::Tabled;

use crate::client::ProviderStats;
use crate::storage::ProviderEventRecord;

#[derive(Debug, Clone, Tabled, Serialize)]
pub struct ProviderDisplay {
    #[tabled(rename = "PROVIDER")]
    pub provider: String,

    #[tabled(rename = "ATTEMPTS")]
    pub attempts: u64,

    #[tabled(rename = "SUCCESS")]
    pub success: u64,

    #[tabled(rename = "FAIL")]
    pub fail: u64,

    #[tabled(rename = "RETRIES")]
    pub retries: u64,

    #[tabled(rename = "LAST ERROR")]
    pub last_error: String,
}

impl From<(&String, &ProviderStats)> for ProviderDisplay {
    fn from((provider, stats): (&String, &ProviderStats)) -> Self {
        Self {
            provider: provider.clone(),
            attempts: stats.attempts,
            success: stats.success,
            fail: stats.fail,
            retries: stats.retries,
            last_error: stats.last_error.clone().unwrap_or_default(),
        }
    }
}

impl From<&ProviderEventRecord> for ProviderDisplay {
    fn from(record: &ProviderEventRecord) -> Self {
        Self {
            provider: record.provider.clone(),
            attempts: record.attempts.max(0) as u64,
            success: record.success.max(0) as u64,
            fail: record.fail.max(0) as u64,
            retries: record.retries.max(0) as u64,
            last_error: record.last_error.clone().unwrap_or_default(),
        }
    }
}
