use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::FeedSource;
use crate::conjunction::{CdmAlertPolicy, FanOut, ScanOptions};
use crate::propagation::Sgp4Options;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub cdm_alerts: CdmAlertPolicy,
    #[serde(default)]
    pub propagation: Sgp4Options,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub base_folder: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// Local TLE files merged into the catalog at startup.
    pub tle_folder: Option<PathBuf>,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "FeedSource::default_active")]
    pub active: FeedSource,
    #[serde(default = "FeedSource::default_debris")]
    pub debris_sources: Vec<FeedSource>,
    #[serde(default = "six_hours", deserialize_with = "deserialize_duration")]
    pub min_refresh_interval: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            active: FeedSource::default_active(),
            debris_sources: FeedSource::default_debris(),
            min_refresh_interval: six_hours(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    #[serde(flatten)]
    pub options: ScanOptions,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default, deserialize_with = "deserialize_optional_duration")]
    pub timeout: Option<Duration>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            options: ScanOptions::default(),
            max_concurrency: default_max_concurrency(),
            timeout: None,
        }
    }
}

impl ScanConfig {
    pub fn fan_out(&self) -> FanOut {
        FanOut {
            max_concurrency: self.max_concurrency,
            timeout: self.timeout,
        }
    }
}

fn default_max_concurrency() -> usize {
    crate::conjunction::DEFAULT_MAX_CONCURRENCY
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "six_hours", deserialize_with = "deserialize_duration")]
    pub tle_fetch_every: Duration,
    #[serde(default = "eight_hours", deserialize_with = "deserialize_duration")]
    pub cdm_scan_every: Duration,
    /// Periodic collision scan; on-demand only when unset.
    #[serde(default, deserialize_with = "deserialize_optional_duration")]
    pub collision_scan_every: Option<Duration>,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            tle_fetch_every: six_hours(),
            cdm_scan_every: eight_hours(),
            collision_scan_every: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn six_hours() -> Duration {
    Duration::from_secs(6 * 3600)
}

fn eight_hours() -> Duration {
    Duration::from_secs(8 * 3600)
}

/// Human-readable durations such as "6h" or "30m".
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

fn deserialize_optional_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom))
        .transpose()
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let scan = &self.scan.options;
        if scan.interval_minutes == 0 {
            return Err(ConfigError::Invalid("scan.interval_minutes must be positive".into()));
        }
        if !(scan.duration_hours.is_finite() && scan.duration_hours > 0.0) {
            return Err(ConfigError::Invalid("scan.duration_hours must be positive".into()));
        }
        scan.grid(chrono::Utc::now())
            .map_err(|e| ConfigError::Invalid(format!("scan: {}", e)))?;
        if self.scan.max_concurrency == 0 {
            return Err(ConfigError::Invalid("scan.max_concurrency must be positive".into()));
        }
        let jobs = &self.jobs;
        let periods = [
            Some(jobs.tle_fetch_every),
            Some(jobs.cdm_scan_every),
            jobs.collision_scan_every,
        ];
        if periods.into_iter().flatten().any(|p| p.is_zero()) {
            return Err(ConfigError::Invalid("job intervals must be positive".into()));
        }
        Ok(())
    }
}
