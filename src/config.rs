//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.skilltrend.toml` files.

use crate::jobs::retention::SWEEP_INTERVAL_MINUTES;
use crate::jobs::Limits;
use crate::models::MAX_JOBS;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".skilltrend.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Retention settings.
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Sync settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding the bucket files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".skilltrend")
}

/// Key-value store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of job records retained.
    #[serde(default = "default_max_jobs")]
    pub max_jobs: usize,

    /// Bucket holding the job list.
    #[serde(default = "default_jobs_bucket")]
    pub jobs_bucket: String,

    /// Bucket holding the sync endpoint.
    #[serde(default = "default_settings_bucket")]
    pub settings_bucket: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_jobs: default_max_jobs(),
            jobs_bucket: default_jobs_bucket(),
            settings_bucket: default_settings_bucket(),
        }
    }
}

fn default_max_jobs() -> usize {
    MAX_JOBS
}

fn default_jobs_bucket() -> String {
    "jobs".to_string()
}

fn default_settings_bucket() -> String {
    "sync".to_string()
}

/// Age-based eviction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Records older than this are swept.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,

    /// Minutes between sweeps in `serve` mode.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_minutes: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            sweep_interval_minutes: default_sweep_interval(),
        }
    }
}

fn default_max_age_days() -> u32 {
    7
}

fn default_sweep_interval() -> u64 {
    SWEEP_INTERVAL_MINUTES
}

/// Remote sync settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Request timeout in seconds. Unset means wait indefinitely.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.data_dir {
            self.general.data_dir = dir.clone();
        }
        if let Some(max_jobs) = args.max_jobs {
            self.store.max_jobs = max_jobs;
        }
    }

    /// Reject settings that would disable the cap, the retention window or the sweeper.
    pub fn validate(&self) -> Result<()> {
        if self.store.max_jobs == 0 {
            bail!("[store] max_jobs must be greater than 0");
        }
        if self.retention.max_age_days == 0 {
            bail!("[retention] max_age_days must be greater than 0");
        }
        if self.retention.sweep_interval_minutes == 0 {
            bail!("[retention] sweep_interval_minutes must be greater than 0");
        }
        if self.retention.sweep_interval_minutes.checked_mul(60).is_none() {
            bail!(
                "[retention] sweep_interval_minutes is too large: {}",
                self.retention.sweep_interval_minutes
            );
        }
        Ok(())
    }

    /// Retention limits for the trend service.
    pub fn limits(&self) -> Limits {
        Limits {
            max_jobs: self.store.max_jobs,
            max_age_days: self.retention.max_age_days,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.retention.sweep_interval_minutes.saturating_mul(60))
    }

    pub fn sync_timeout(&self) -> Option<Duration> {
        self.sync.timeout_seconds.map(Duration::from_secs)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.max_jobs, 100);
        assert_eq!(config.retention.max_age_days, 7);
        assert_eq!(config.sweep_interval(), Duration::from_secs(10_080 * 60));
        assert_eq!(config.sync_timeout(), None);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
data_dir = "/var/lib/skilltrend"

[store]
max_jobs = 50

[retention]
max_age_days = 14

[sync]
timeout_seconds = 30
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.data_dir, PathBuf::from("/var/lib/skilltrend"));
        assert_eq!(config.store.jobs_bucket, "jobs");
        assert_eq!(
            config.limits(),
            Limits {
                max_jobs: 50,
                max_age_days: 14
            }
        );
        assert_eq!(config.retention.sweep_interval_minutes, 10_080);
        assert_eq!(config.sync_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[retention]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.store.max_jobs, 100);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let config: Config = toml::from_str("[retention]\nsweep_interval_minutes = 0").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sweep_interval_minutes"));
    }

    #[test]
    fn test_overflowing_sweep_interval_rejected() {
        let config: Config =
            toml::from_str(&format!("[retention]\nsweep_interval_minutes = {}", u64::MAX / 2))
                .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_zero_max_jobs_rejected() {
        let config: Config = toml::from_str("[store]\nmax_jobs = 0").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_jobs"));
    }

    #[test]
    fn test_zero_max_age_rejected() {
        let config: Config = toml::from_str("[retention]\nmax_age_days = 0").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_age_days"));
    }
}
