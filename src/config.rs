//! Configuration file loading.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Top-level configuration file.
///
/// ```toml
/// [kafka_consumer]
/// brokers = "localhost:9092"
/// topics = ["metrics"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub kafka_consumer: kafka_consumer::Config,
}

impl AppConfig {
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Invalid configuration")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Sample configuration file content.
pub fn sample_config() -> String {
    format!("[kafka_consumer]{}", kafka_consumer::SAMPLE_CONFIG)
}
