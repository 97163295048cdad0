// src/config/mod.rs
pub mod collector;

pub use collector::{
    AlmConfig, CollectorConfig, DatadogConfig, GeneralConfig, LoggingConfig, SinkKind,
    WeatherConfig,
};

use std::path::PathBuf;

pub const ENV_CONFIG_PATH: &str = "COLLECTOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/collector.toml";

/// $COLLECTOR_CONFIG_PATH, falling back to `config/collector.toml`.
pub fn config_path() -> PathBuf {
    std::env::var(ENV_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Resolve the path and load. Any error here is fatal for the process.
pub fn load_default() -> anyhow::Result<CollectorConfig> {
    CollectorConfig::load_from_file(config_path())
}
