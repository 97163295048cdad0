// src/config/collector.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

use crate::ingest::Mode;

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}
fn default_service() -> String {
    "api-data-collector".to_string()
}
fn default_source() -> String {
    "collector".to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    File,
    Datadog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// "openweathermap" | "sap" (aliases "weather" | "alm"). Parsed by the loop.
    pub mode: String,
    pub collection_interval_seconds: u64,
    /// Inferred from the present sections when omitted.
    #[serde(default)]
    pub sink: Option<SinkKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub log_file_path: String,
    /// Python-style `when`: S, M, H, D, midnight, W0..W6.
    pub log_rotation_interval: String,
    /// 0 keeps every backup.
    pub log_backup_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatadogConfig {
    /// "ENV" means: read from DD_API_KEY
    pub api_key: String,
    pub log_url: String,
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default = "default_source")]
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// "ENV" means: read from OPENWEATHERMAP_API_KEY
    pub api_key: String,
    pub city: String,
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlmConfig {
    pub token_url: String,
    pub client_id: String,
    /// "ENV" means: read from SAP_CLIENT_SECRET
    pub client_secret: String,
    /// Service root; entity names and `$metadata` are appended verbatim.
    pub base_api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub general: GeneralConfig,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub datadog: Option<DatadogConfig>,
    #[serde(default)]
    pub openweathermap: Option<WeatherConfig>,
    #[serde(default)]
    pub sap: Option<AlmConfig>,
}

impl CollectorConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("config file not found: {}", path.display());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: CollectorConfig = toml::from_str(s)?;

        if let Some(w) = cfg.openweathermap.as_mut() {
            w.api_key = resolve_secret(&w.api_key, "OPENWEATHERMAP_API_KEY")?;
        }
        if let Some(d) = cfg.datadog.as_mut() {
            d.api_key = resolve_secret(&d.api_key, "DD_API_KEY")?;
        }
        if let Some(s) = cfg.sap.as_mut() {
            s.client_secret = resolve_secret(&s.client_secret, "SAP_CLIENT_SECRET")?;
        }

        // Fails early when the selected sink has no section.
        cfg.sink_kind()?;

        match Mode::parse(&cfg.general.mode) {
            Some(Mode::Weather) if cfg.openweathermap.is_none() => {
                bail!("mode '{}' requires an [openweathermap] section", cfg.general.mode)
            }
            Some(Mode::Alm) if cfg.sap.is_none() => {
                bail!("mode '{}' requires a [sap] section", cfg.general.mode)
            }
            // Unknown modes are reported by the collector loop, not here.
            _ => {}
        }

        Ok(cfg)
    }

    /// Which sink this deployment writes to.
    pub fn sink_kind(&self) -> Result<SinkKind> {
        let kind = match self.general.sink {
            Some(k) => k,
            None if self.logging.is_some() => SinkKind::File,
            None if self.datadog.is_some() => SinkKind::Datadog,
            None => bail!("config needs either a [logging] or a [datadog] section"),
        };
        match kind {
            SinkKind::File if self.logging.is_none() => {
                bail!("sink 'file' requires a [logging] section")
            }
            SinkKind::Datadog if self.datadog.is_none() => {
                bail!("sink 'datadog' requires a [datadog] section")
            }
            _ => Ok(kind),
        }
    }
}

fn resolve_secret(value: &str, env_key: &str) -> Result<String> {
    if value.trim().eq_ignore_ascii_case("env") {
        env::var(env_key).map_err(|_| anyhow!("Missing {env_key} env var"))
    } else {
        Ok(value.to_string())
    }
}
