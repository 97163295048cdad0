// src/sink/forward.rs
use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::RecordSink;
use crate::config::DatadogConfig;
use crate::record::Record;

const TIMEOUT: Duration = Duration::from_secs(10);
const MISSING_TAG: &str = "n/a";

/// Body POSTed to the log intake for one record.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub ddsource: String,
    pub ddtags: String,
    pub hostname: String,
    pub service: String,
    /// The record as JSON text.
    pub message: String,
}

/// `city:<city>,entity:<entity>`, with `n/a` for whichever the record lacks.
pub fn tags_for(record: &Record) -> String {
    format!(
        "city:{},entity:{}",
        record.city().unwrap_or(MISSING_TAG),
        record.entity().unwrap_or(MISSING_TAG)
    )
}

pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Forwards each record to a Datadog-compatible HTTP log intake.
///
/// Delivery is fire-and-forget: failures are logged and counted, never
/// retried or queued.
#[derive(Clone)]
pub struct DatadogSink {
    cfg: DatadogConfig,
    hostname: String,
    client: Client,
}

impl DatadogSink {
    pub fn new(cfg: DatadogConfig, client: Client) -> Self {
        Self {
            cfg,
            hostname: local_hostname(),
            client,
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn envelope(&self, record: &Record) -> Result<Envelope> {
        Ok(Envelope {
            ddsource: self.cfg.source.clone(),
            ddtags: tags_for(record),
            hostname: self.hostname.clone(),
            service: self.cfg.service.clone(),
            message: record.to_json_line()?,
        })
    }

    /// POST one envelope; `Err` carries the reason for the operator log.
    async fn send(&self, envelope: &Envelope) -> Result<()> {
        let rsp = self
            .client
            .post(&self.cfg.log_url)
            .header("DD-API-KEY", &self.cfg.api_key)
            .timeout(TIMEOUT)
            .json(envelope)
            .send()
            .await?;
        if let Err(e) = rsp.error_for_status_ref() {
            anyhow::bail!("log intake HTTP error: {e}");
        }
        Ok(())
    }
}

#[async_trait]
impl RecordSink for DatadogSink {
    async fn write(&mut self, record: &Record) -> Result<()> {
        let result = match self.envelope(record) {
            Ok(envelope) => self.send(&envelope).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                tracing::info!(
                    source_api = record.source_api().as_str(),
                    "record forwarded to log intake"
                );
            }
            Err(e) => {
                counter!("sink_forward_failures_total").increment(1);
                tracing::warn!(
                    error = %format!("{e:#}"),
                    source_api = record.source_api().as_str(),
                    "failed to forward record, dropping it"
                );
            }
        }
        Ok(())
    }

    fn target(&self) -> String {
        self.cfg.log_url.clone()
    }
}
