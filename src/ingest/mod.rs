// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod types;

use crate::config::CollectorConfig;
use crate::ingest::providers::{alm::AlmProvider, weather::WeatherProvider};
use crate::ingest::types::SourceProvider;
use crate::record::Record;
use anyhow::{anyhow, Result};
use metrics::{counter, describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up once a recorder exists).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("collector_cycles_total", "Collection cycles started.");
        describe_counter!(
            "collector_records_total",
            "Records handed to the sink, by source and status."
        );
        describe_counter!(
            "collector_provider_errors_total",
            "Fetches that ended in an error record."
        );
        describe_counter!(
            "sink_forward_failures_total",
            "Records the forwarding sink failed to deliver."
        );
        describe_counter!("sink_rotations_total", "Log file rollovers.");
        describe_gauge!(
            "collector_last_cycle_ts",
            "Unix ts when the last cycle finished."
        );
    });
}

/// Which upstream API a deployment polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Weather,
    Alm,
}

impl Mode {
    /// `None` for anything the collector does not know how to poll.
    pub fn parse(s: &str) -> Option<Mode> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openweathermap" | "weather" => Some(Mode::Weather),
            "sap" | "alm" => Some(Mode::Alm),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Weather => "openweathermap",
            Mode::Alm => "sap",
        }
    }
}

/// Shared client; timeouts are set per request.
pub fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("api-data-collector/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| anyhow!("building http client: {e}"))
}

/// Build the adapter for `mode` from its credential section.
pub fn build_provider(
    mode: Mode,
    cfg: &CollectorConfig,
    client: reqwest::Client,
) -> Result<Box<dyn SourceProvider>> {
    match mode {
        Mode::Weather => {
            let w = cfg
                .openweathermap
                .clone()
                .ok_or_else(|| anyhow!("missing [openweathermap] section"))?;
            Ok(Box::new(WeatherProvider::new(w, client)))
        }
        Mode::Alm => {
            let s = cfg
                .sap
                .clone()
                .ok_or_else(|| anyhow!("missing [sap] section"))?;
            Ok(Box::new(AlmProvider::new(s, client)))
        }
    }
}

pub(crate) fn count_record(record: &Record) {
    counter!(
        "collector_records_total",
        "source_api" => record.source_api().as_str(),
        "status" => record.status_label()
    )
    .increment(1);
}
