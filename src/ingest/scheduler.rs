// src/ingest/scheduler.rs
use anyhow::Result;
use metrics::{counter, gauge};
use std::time::Duration;

use crate::config::CollectorConfig;
use crate::ingest::{self, types::SourceProvider, Mode};
use crate::sink::RecordSink;

/// Why the collection loop stopped without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// `general.mode` names no known source; nothing was dispatched.
    InvalidMode(String),
    /// The requested number of cycles ran (bounded runs only).
    Completed(u64),
}

/// Poll-and-dispatch loop: fetch with the configured provider, hand every
/// record to the sink, sleep, repeat.
pub struct Collector {
    cfg: CollectorConfig,
    client: reqwest::Client,
    sink: Box<dyn RecordSink>,
}

impl Collector {
    pub fn new(cfg: CollectorConfig, client: reqwest::Client, sink: Box<dyn RecordSink>) -> Self {
        Self { cfg, client, sink }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.cfg.general.collection_interval_seconds)
    }

    /// One cycle. Returns how many records reached the sink.
    pub async fn run_cycle(&mut self, provider: &dyn SourceProvider) -> Result<usize> {
        ingest::ensure_metrics_described();
        counter!("collector_cycles_total").increment(1);

        let records = provider.collect().await;
        for record in &records {
            self.sink.write(record).await?;
            ingest::count_record(record);
        }

        gauge!("collector_last_cycle_ts").set(chrono::Utc::now().timestamp() as f64);
        tracing::debug!(
            source_api = provider.source_api().as_str(),
            records = records.len(),
            "cycle finished"
        );
        Ok(records.len())
    }

    /// Run until the process is stopped. Only returns for an invalid mode or
    /// when a sink error escapes a cycle.
    pub async fn run(&mut self) -> Result<LoopExit> {
        self.run_for(None).await
    }

    /// Like `run`, but stops after `max_cycles` when given.
    pub async fn run_for(&mut self, max_cycles: Option<u64>) -> Result<LoopExit> {
        // Read once; never re-read mid-run.
        let raw_mode = self.cfg.general.mode.clone();
        let Some(mode) = Mode::parse(&raw_mode) else {
            tracing::error!(mode = %raw_mode, "invalid mode in config, exiting");
            return Ok(LoopExit::InvalidMode(raw_mode));
        };
        let provider = ingest::build_provider(mode, &self.cfg, self.client.clone())?;
        let interval = self.interval();

        tracing::info!(
            mode = mode.as_str(),
            interval_secs = interval.as_secs(),
            target = %self.sink.target(),
            "collector started"
        );

        let mut cycles = 0u64;
        loop {
            self.run_cycle(provider.as_ref()).await?;
            cycles += 1;
            if max_cycles.is_some_and(|max| cycles >= max) {
                return Ok(LoopExit::Completed(cycles));
            }
            tokio::time::sleep(interval).await;
        }
    }
}
