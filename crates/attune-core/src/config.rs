use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AttuneError, Result};

/// Top-level configuration for the Attune application.
///
/// Loaded from `~/.attune/config.toml` by default. Each section corresponds
/// to one subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttuneConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reply: ReplyConfig,
}

impl AttuneConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AttuneConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AttuneError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Backend speech-analysis API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the analysis backend.
    pub base_url: String,
    /// Timeout in seconds for lightweight GET/JSON endpoints.
    pub standard_timeout_secs: u64,
    /// Timeout in seconds for audio uploads up to the large-payload tier.
    pub upload_timeout_secs: u64,
    /// Timeout in seconds for uploads above `large_upload_bytes`.
    pub long_upload_timeout_secs: u64,
    /// Timeout in seconds for the liveness probe.
    pub health_timeout_secs: u64,
    /// Default number of additional attempts after the first failure.
    pub max_retries: u32,
    /// Base delay in milliseconds; retry n waits n times this value.
    pub retry_base_delay_ms: u64,
    /// Hard cap on audio payload size in bytes.
    pub max_upload_bytes: usize,
    /// Payloads above this size get the long upload timeout.
    pub large_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            standard_timeout_secs: 15,
            upload_timeout_secs: 60,
            long_upload_timeout_secs: 180,
            health_timeout_secs: 5,
            max_retries: 2,
            retry_base_delay_ms: 1000,
            max_upload_bytes: 25 * 1024 * 1024,
            large_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Durable conversation storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the persisted key-value files.
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.attune/data".to_string(),
        }
    }
}

/// Reply generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    /// Default personality identifier.
    pub personality: String,
    /// Number of recent turns sent to the reply collaborator.
    pub context_turns: usize,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            personality: "supportive".to_string(),
            context_turns: 8,
        }
    }
}
