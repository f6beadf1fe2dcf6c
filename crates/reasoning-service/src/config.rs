//! Service configuration

use anyhow::{Context, Result};
use reasoning_lib::EngineConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming an optional config file
pub const CONFIG_FILE_ENV: &str = "REASONING_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = "config/reasoning.yaml";
const ENV_PREFIX: &str = "REASONING";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Name attached to structured log events
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// JSON case file; the in-memory store is used when unset
    #[serde(default)]
    pub case_store_path: Option<PathBuf>,

    #[serde(default = "default_similar_case_timeout_ms")]
    pub similar_case_timeout_ms: u64,

    /// Enables the isolation forest outlier detector
    #[serde(default = "default_anomaly_detection")]
    pub anomaly_detection: bool,

    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_service_name() -> String {
    "reasoning-service".to_string()
}

fn default_similar_case_timeout_ms() -> u64 {
    2000
}

fn default_anomaly_detection() -> bool {
    true
}

fn default_max_recommendations() -> usize {
    5
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            service_name: default_service_name(),
            case_store_path: None,
            similar_case_timeout_ms: default_similar_case_timeout_ms(),
            anomaly_detection: default_anomaly_detection(),
            max_recommendations: default_max_recommendations(),
        }
    }
}

impl ServiceConfig {
    /// Load from the optional config file and `REASONING_*` environment
    /// variables, environment taking precedence
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&file)
    }

    pub fn load_from(file: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read configuration from {}", file))?;

        config
            .try_deserialize()
            .context("Invalid reasoning service configuration")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            service_name: self.service_name.clone(),
            similar_case_timeout: Duration::from_millis(self.similar_case_timeout_ms),
            anomaly_detection: self.anomaly_detection,
            max_recommendations: self.max_recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServiceConfig::load_from("does/not/exist.yaml").unwrap();
        assert_eq!(config.port, 8082);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.similar_case_timeout_ms, 2000);
        assert!(config.anomaly_detection);
        assert!(config.case_store_path.is_none());
    }

    #[test]
    fn test_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "port: 9100").unwrap();
        writeln!(file, "case_store_path: /var/lib/reasoning/cases.json").unwrap();
        writeln!(file, "anomaly_detection: false").unwrap();
        writeln!(file, "max_recommendations: 3").unwrap();

        let config = ServiceConfig::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(
            config.case_store_path,
            Some(PathBuf::from("/var/lib/reasoning/cases.json"))
        );
        assert!(!config.anomaly_detection);
        assert_eq!(config.service_name, "reasoning-service");

        let engine = config.engine_config();
        assert_eq!(engine.max_recommendations, 3);
        assert_eq!(engine.similar_case_timeout, Duration::from_millis(2000));
    }

    #[test]
    fn test_bind_addr() {
        let config = ServiceConfig {
            host: "127.0.0.1".to_string(),
            ..Default::default()
        };
        assert_eq!(config.bind_addr(), "127.0.0.1:8082");
    }
}
