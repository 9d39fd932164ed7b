use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

pub const DEFAULT_BASE_URL: &str = "https://petstore.swagger.io/v2";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_WORKERS: usize = 20;
pub const DEFAULT_CONFIRM_DELAY_MS: u64 = 250;

/// Run-wide settings. Loaded from an optional JSON file, then overridden by
/// command-line flags and environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_workers: usize,
    /// Extra attempts for read-after-write confirmation reads. Zero means
    /// the remote is trusted to show its own writes immediately.
    pub confirm_retries: u32,
    pub confirm_delay_ms: u64,
    pub fail_fast: bool,
    pub verify_ssl: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_workers: DEFAULT_MAX_WORKERS,
            confirm_retries: 0,
            confirm_delay_ms: DEFAULT_CONFIRM_DELAY_MS,
            fail_fast: false,
            verify_ssl: true,
        }
    }
}

impl HarnessConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| HarnessError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: HarnessConfig =
            serde_json::from_str(&raw).map_err(|source| HarnessError::ParseConfig {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(HarnessError::InvalidConfig("baseUrl must not be empty".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(HarnessError::InvalidConfig(
                "timeoutMs must be greater than 0".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(HarnessError::InvalidConfig(
                "maxWorkers must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_delay_ms)
    }
}
