use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::metrics::pump::PumpSettings;
use crate::metrics::retention::RetentionPolicy;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub history: HistoryConfig,
    pub collector: CollectorConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub refresh_rate_ms: u64,
    pub default_sort: String,
    pub history_window_secs: u64,
    pub max_processes: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            refresh_rate_ms: 1000,
            default_sort: "cpu".to_string(),
            history_window_secs: 60,
            max_processes: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub buffer_cap: usize,
    pub retention_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            buffer_cap: 1000,
            retention_secs: 300,
            cleanup_interval_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub collection_timeout_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            collection_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExporterKind {
    Log,
    Jsonl,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub exporter: ExporterKind,
    pub output_path: Option<PathBuf>,
    pub queue_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            enabled: true,
            exporter: ExporterKind::Log,
            output_path: None,
            queue_capacity: 64,
        }
    }
}

impl Config {
    /// Validates the pipeline section of the config.
    pub fn pipeline(&self) -> Result<(PumpSettings, RetentionPolicy), ConfigError> {
        if self.general.refresh_rate_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "general.refresh_rate_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.collector.collection_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "collector.collection_timeout_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        let settings = PumpSettings::new(Duration::from_millis(self.general.refresh_rate_ms))
            .with_collection_timeout(Duration::from_millis(
                self.collector.collection_timeout_ms,
            ));
        let policy = RetentionPolicy::new(
            self.history.buffer_cap,
            Duration::from_secs(self.history.retention_secs),
            Duration::from_secs(self.history.cleanup_interval_secs),
        )?;
        Ok((settings, policy))
    }

    pub fn history_window(&self) -> Duration {
        Duration::from_secs(self.general.history_window_secs.max(1))
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("hostwatch").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

/// Reads `path`, falling back to defaults when it is missing or malformed.
pub fn load_config_from_path(path: &Path) -> Config {
    match try_load_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "using default config");
            Config::default()
        }
    }
}

pub fn try_load_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}
