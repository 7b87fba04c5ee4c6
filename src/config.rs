use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::channel::DEFAULT_CHANNEL_CAPACITY;
use crate::stages::auditor::DEFAULT_AUDIT_TRAIL_LEN;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    /// "hourly", "daily", anything else never rotates
    pub rotation: String,
    pub gateway: GatewayConfig,
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "forex_engine.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            gateway: GatewayConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Pipeline sizing and trade synthesis
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of the producer -> validator trade channel
    pub queue_capacity: usize,
    /// Capacity of each downstream stage channel
    pub stage_capacity: usize,
    pub produce_interval_ms: u64,
    pub from_currency: String,
    pub to_currency: String,
    pub audit_trail_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_CHANNEL_CAPACITY,
            stage_capacity: DEFAULT_CHANNEL_CAPACITY,
            produce_interval_ms: 10_000,
            from_currency: "USD".to_string(),
            to_currency: "EUR".to_string(),
            audit_trail_len: DEFAULT_AUDIT_TRAIL_LEN,
        }
    }
}

impl PipelineConfig {
    pub fn produce_interval(&self) -> Duration {
        Duration::from_millis(self.produce_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 || self.stage_capacity == 0 {
            return Err(ConfigError::Invalid(
                "pipeline channel capacities must be positive".to_string(),
            ));
        }
        if self.produce_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.produce_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load `config/{env}.yaml`
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        Self::load_from(format!("config/{}.yaml", env))
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.pipeline.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_yaml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.queue_capacity, 10_000);
        assert_eq!(config.pipeline.produce_interval(), Duration::from_secs(10));
        assert_eq!(config.pipeline.from_currency, "USD");
        assert_eq!(config.pipeline.to_currency, "EUR");
        assert_eq!(config.pipeline.audit_trail_len, 1000);
        assert_eq!(config.gateway.port, 8080);
    }

    #[test]
    fn test_load_partial_yaml_fills_defaults() {
        let file = write_yaml(
            "log_level: debug\n\
             pipeline:\n  \
               queue_capacity: 16\n  \
               produce_interval_ms: 250\n",
        );

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.pipeline.queue_capacity, 16);
        assert_eq!(config.pipeline.produce_interval_ms, 250);
        assert_eq!(config.pipeline.stage_capacity, 10_000);
        assert_eq!(config.gateway.host, "0.0.0.0");
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load_from("/nonexistent/forex.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_bad_yaml() {
        let file = write_yaml("pipeline: [not, a, map]\n");
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let file = write_yaml("pipeline:\n  stage_capacity: 0\n");
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
